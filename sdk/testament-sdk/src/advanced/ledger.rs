use crate::config::{ConfigError, TestamentConfig};
use crate::core::abi::ITestament;
use crate::core::connection::{
    ContractRead, ContractWrite, LedgerError, LedgerValue, PendingWrite, TestamentLedger,
    WriteReceipt,
};
use crate::core::constants::{DEFAULT_CONFIRMATIONS, DEFAULT_POLL_INTERVAL_MS, USER_REJECTED_CODE};
use crate::types::AccountAddress;
use alloy::network::ReceiptResponse;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use alloy::transports::{RpcError, TransportError};
use async_trait::async_trait;
use log::{debug, trace};
use std::str::FromStr;
use std::time::Duration;

/// [`TestamentLedger`] backed by an alloy JSON-RPC provider.
///
/// Accounts are managed by the endpoint (an EIP-1193 wallet bridge or a dev
/// node): writes go out through `eth_sendTransaction` and no key is held here.
#[derive(Clone)]
pub struct AlloyLedger {
    provider: DynProvider,
    contract: Address,
    confirmations: u64,
    poll_interval: Duration,
}

impl AlloyLedger {
    pub fn new(provider: DynProvider, contract: Address) -> Self {
        Self {
            provider,
            contract,
            confirmations: DEFAULT_CONFIRMATIONS,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    /// Connect over HTTP using the endpoint and contract of `config`
    pub fn from_config(config: &TestamentConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let url = config
            .rpc_url
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("rpc_url {}: {}", config.rpc_url, e)))?;
        let provider = ProviderBuilder::new().connect_http(url).erased();

        Ok(Self::new(provider, config.contract()?)
            .with_confirmations(config.confirmations)
            .with_poll_interval(config.poll_interval()))
    }

    pub fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations.max(1);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    fn request(
        &self,
        from: &AccountAddress,
        data: Vec<u8>,
    ) -> Result<TransactionRequest, LedgerError> {
        let from = Address::from_str(from.normalized())
            .map_err(|e| LedgerError::Decode(format!("account {}: {}", from, e)))?;
        Ok(TransactionRequest::default()
            .from(from)
            .to(self.contract)
            .input(data.into()))
    }
}

#[async_trait]
impl TestamentLedger for AlloyLedger {
    async fn request_accounts(&self) -> Result<Vec<String>, LedgerError> {
        let accounts: Vec<Address> = self
            .provider
            .raw_request("eth_requestAccounts".into(), ())
            .await
            .map_err(classify)?;
        Ok(accounts.into_iter().map(|a| a.to_checksum(None)).collect())
    }

    async fn call(
        &self,
        from: &AccountAddress,
        read: ContractRead,
    ) -> Result<LedgerValue, LedgerError> {
        let data = match read {
            ContractRead::Heir => ITestament::heirCall {}.abi_encode(),
            ContractRead::Notary => ITestament::notaryCall {}.abi_encode(),
            ContractRead::Testator => ITestament::testatorCall {}.abi_encode(),
            ContractRead::IsDeceased => ITestament::isDeceasedCall {}.abi_encode(),
            ContractRead::UnlockTime => ITestament::unlockTimeCall {}.abi_encode(),
            ContractRead::DocumentHash => ITestament::getDocumentHashCall {}.abi_encode(),
        };
        let tx = self.request(from, data)?;
        let out = self.provider.call(tx).await.map_err(classify)?;
        trace!("[{}] raw return 0x{}", read, alloy::hex::encode(&out));
        decode(read, &out)
    }

    async fn send(
        &self,
        from: &AccountAddress,
        write: ContractWrite,
    ) -> Result<PendingWrite, LedgerError> {
        let data = match write {
            ContractWrite::ConfirmDeath => ITestament::confirmDeathCall {}.abi_encode(),
            ContractWrite::UnlockTestament => ITestament::unlockTestamentCall {}.abi_encode(),
        };
        let tx = self.request(from, data)?;
        let pending = self.provider.send_transaction(tx).await.map_err(classify)?;
        Ok(PendingWrite {
            write,
            tx_hash: alloy::hex::encode_prefixed(pending.tx_hash()),
        })
    }

    async fn wait_for_finality(&self, pending: &PendingWrite) -> Result<WriteReceipt, LedgerError> {
        let hash = TxHash::from_str(&pending.tx_hash)
            .map_err(|e| LedgerError::Decode(format!("tx hash {}: {}", pending.tx_hash, e)))?;

        let receipt = loop {
            match self
                .provider
                .get_transaction_receipt(hash)
                .await
                .map_err(classify)?
            {
                Some(receipt) => break receipt,
                None => {
                    trace!("[{}] {} not mined yet", pending.write, pending.tx_hash);
                    tokio::time::sleep(self.poll_interval).await;
                },
            }
        };

        if !receipt.status() {
            return Err(LedgerError::Reverted(pending.tx_hash.clone()));
        }

        if let Some(included) = receipt.block_number {
            let target = included + self.confirmations - 1;
            loop {
                let head = self.provider.get_block_number().await.map_err(classify)?;
                if head >= target {
                    break;
                }
                debug!(
                    "[{}] {} at block {}, head {}, waiting for {}",
                    pending.write, pending.tx_hash, included, head, target
                );
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        Ok(WriteReceipt {
            tx_hash: pending.tx_hash.clone(),
            block_number: receipt.block_number,
        })
    }
}

fn classify(e: TransportError) -> LedgerError {
    match &e {
        RpcError::ErrorResp(payload) if payload.code == USER_REJECTED_CODE => LedgerError::Rejected,
        RpcError::Transport(kind) => LedgerError::Unavailable(kind.to_string()),
        _ => LedgerError::Transport(e.to_string()),
    }
}

fn decode_error(read: ContractRead, e: alloy::sol_types::Error) -> LedgerError {
    LedgerError::Decode(format!("{}: {}", read, e))
}

fn decode(read: ContractRead, out: &[u8]) -> Result<LedgerValue, LedgerError> {
    let value = match read {
        ContractRead::Heir => LedgerValue::Address(
            ITestament::heirCall::abi_decode_returns(out)
                .map_err(|e| decode_error(read, e))?
                .to_checksum(None),
        ),
        ContractRead::Notary => LedgerValue::Address(
            ITestament::notaryCall::abi_decode_returns(out)
                .map_err(|e| decode_error(read, e))?
                .to_checksum(None),
        ),
        ContractRead::Testator => LedgerValue::Address(
            ITestament::testatorCall::abi_decode_returns(out)
                .map_err(|e| decode_error(read, e))?
                .to_checksum(None),
        ),
        ContractRead::IsDeceased => LedgerValue::Bool(
            ITestament::isDeceasedCall::abi_decode_returns(out)
                .map_err(|e| decode_error(read, e))?,
        ),
        ContractRead::UnlockTime => {
            let seconds: U256 = ITestament::unlockTimeCall::abi_decode_returns(out)
                .map_err(|e| decode_error(read, e))?;
            let seconds = u64::try_from(seconds)
                .map_err(|_| LedgerError::Decode(format!("{}: {} overflows u64", read, seconds)))?;
            LedgerValue::Uint(seconds)
        },
        ContractRead::DocumentHash => LedgerValue::Text(
            ITestament::getDocumentHashCall::abi_decode_returns(out)
                .map_err(|e| decode_error(read, e))?,
        ),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::rpc::json_rpc::ErrorPayload;
    use alloy::sol_types::SolValue;
    use alloy::transports::TransportErrorKind;

    #[test]
    fn test_decode_address_is_checksummed() {
        let addr = Address::from_str("0x5b329bbe9b59b53ef2c06e1403178303b72280d8").unwrap();
        let out = addr.abi_encode();
        assert_eq!(
            decode(ContractRead::Heir, &out).unwrap(),
            LedgerValue::Address("0x5b329bBe9b59b53eF2c06E1403178303b72280D8".to_string())
        );
    }

    #[test]
    fn test_decode_scalars_and_text() {
        let out = true.abi_encode();
        assert_eq!(
            decode(ContractRead::IsDeceased, &out).unwrap(),
            LedgerValue::Bool(true)
        );

        let out = U256::from(1_700_000_000u64).abi_encode();
        assert_eq!(
            decode(ContractRead::UnlockTime, &out).unwrap(),
            LedgerValue::Uint(1_700_000_000)
        );

        let out = (String::from("ipfs://abc123"),).abi_encode_params();
        assert_eq!(
            decode(ContractRead::DocumentHash, &out).unwrap(),
            LedgerValue::Text("ipfs://abc123".to_string())
        );
    }

    #[test]
    fn test_decode_rejects_oversized_timestamp() {
        let out = U256::MAX.abi_encode();
        assert!(matches!(
            decode(ContractRead::UnlockTime, &out),
            Err(LedgerError::Decode(_))
        ));
    }

    fn error_response(code: i64, message: &'static str) -> TransportError {
        RpcError::ErrorResp(ErrorPayload {
            code,
            message: message.into(),
            data: None,
        })
    }

    #[test]
    fn test_classify_wallet_decline() {
        let declined = error_response(USER_REJECTED_CODE, "User rejected the request.");
        assert_eq!(classify(declined), LedgerError::Rejected);
    }

    #[test]
    fn test_classify_other_rpc_errors() {
        match classify(error_response(-32000, "execution reverted")) {
            LedgerError::Transport(cause) => assert!(cause.contains("execution reverted")),
            other => panic!("expected Transport, got {:?}", other),
        }

        let unreachable = TransportErrorKind::custom_str("connection refused");
        match classify(unreachable) {
            LedgerError::Unavailable(cause) => assert!(cause.contains("connection refused")),
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_short_return() {
        assert!(matches!(
            decode(ContractRead::Heir, &[0u8; 4]),
            Err(LedgerError::Decode(_))
        ));
    }
}
