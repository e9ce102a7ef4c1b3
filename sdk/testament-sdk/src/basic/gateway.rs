use crate::core::connection::{
    ContractRead, ContractWrite, LedgerError, LedgerValue, TestamentLedger, WriteReceipt,
};
use crate::error::GatewayError;
use crate::types::{AccountAddress, Session};
use crate::utils;
use log::{debug, error, info, warn};
use std::time::Duration;
use tokio::sync::RwLock;

/// Single authenticated connection to the ledger plus the contract binding.
///
/// The gateway is the only component that touches the ledger and the only
/// mutator of the session. Every call is a fresh round trip; nothing is cached.
pub struct ContractGateway<L> {
    ledger: L,
    session: RwLock<Option<Session>>,
    finality_timeout: Option<Duration>,
}

impl<L: TestamentLedger> ContractGateway<L> {
    pub fn new(ledger: L) -> Self {
        Self {
            ledger,
            session: RwLock::new(None),
            finality_timeout: None,
        }
    }

    /// Bound the finality wait of both writes
    pub fn with_finality_timeout(mut self, timeout: Duration) -> Self {
        self.finality_timeout = Some(timeout);
        self
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    //=========================================================================
    // Session
    //=========================================================================

    /// Request account access and open a session on the first account.
    ///
    /// Safe to call repeatedly: the session is replaced by the wallet's
    /// current account. On failure the existing session is left untouched.
    pub async fn connect(&self) -> Result<Session, GatewayError> {
        debug!("[connect] requesting account access");
        let accounts = self.ledger.request_accounts().await.map_err(|e| {
            warn!("[connect] account request failed: {}", e);
            match e {
                LedgerError::Rejected => GatewayError::UserRejected,
                LedgerError::Unavailable(cause) | LedgerError::Transport(cause) => {
                    GatewayError::WalletUnavailable(cause)
                },
                other => GatewayError::WalletUnavailable(other.to_string()),
            }
        })?;

        let account = accounts
            .into_iter()
            .map(AccountAddress::new)
            .find(|a| !a.as_raw().is_empty())
            .ok_or_else(|| {
                warn!("[connect] wallet granted no account");
                GatewayError::UserRejected
            })?;

        let session = Session::new(account);
        *self.session.write().await = Some(session.clone());
        info!("[connect] connected account {}", session.account);
        Ok(session)
    }

    /// Drop the session. A new `connect` is required afterwards.
    pub async fn disconnect(&self) {
        if let Some(session) = self.session.write().await.take() {
            info!("[disconnect] session for {} closed", session.account);
        }
    }

    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    async fn current_account(&self) -> Result<AccountAddress, GatewayError> {
        self.session
            .read()
            .await
            .as_ref()
            .filter(|s| s.connected)
            .map(|s| s.account.clone())
            .ok_or(GatewayError::ContractUnavailable)
    }

    //=========================================================================
    // Reads
    //=========================================================================

    async fn read(&self, read: ContractRead) -> Result<LedgerValue, GatewayError> {
        let account = self.current_account().await?;
        debug!("[{}] calling from {}", read, account);
        let value = self.ledger.call(&account, read).await.map_err(|e| {
            error!("[{}] read failed: {}", read, e);
            GatewayError::ReadFailed {
                read,
                cause: e.to_string(),
            }
        })?;
        debug!("[{}] returned {:?}", read, value);
        Ok(value)
    }

    pub async fn read_heir(&self) -> Result<String, GatewayError> {
        let value = self.read(ContractRead::Heir).await?;
        utils::expect_address(ContractRead::Heir, value)
    }

    pub async fn read_notary(&self) -> Result<String, GatewayError> {
        let value = self.read(ContractRead::Notary).await?;
        utils::expect_address(ContractRead::Notary, value)
    }

    pub async fn read_testator(&self) -> Result<String, GatewayError> {
        let value = self.read(ContractRead::Testator).await?;
        utils::expect_address(ContractRead::Testator, value)
    }

    pub async fn read_deceased(&self) -> Result<bool, GatewayError> {
        let value = self.read(ContractRead::IsDeceased).await?;
        utils::expect_bool(ContractRead::IsDeceased, value)
    }

    /// Unlock time in unix seconds, as stored on-chain
    pub async fn read_unlock_timestamp(&self) -> Result<u64, GatewayError> {
        let value = self.read(ContractRead::UnlockTime).await?;
        utils::expect_uint(ContractRead::UnlockTime, value)
    }

    pub async fn read_document_hash(&self) -> Result<String, GatewayError> {
        let value = self.read(ContractRead::DocumentHash).await?;
        utils::expect_text(ContractRead::DocumentHash, value)
    }

    //=========================================================================
    // Writes
    //=========================================================================

    /// Notary: confirm the testator's death. Returns after finality.
    pub async fn submit_confirm_death(&self) -> Result<WriteReceipt, GatewayError> {
        self.submit(ContractWrite::ConfirmDeath).await
    }

    /// Heir: flip the contract to unlocked. Returns after finality.
    ///
    /// The document itself is not returned; read it with
    /// [`read_document_hash`](Self::read_document_hash) afterwards.
    pub async fn submit_unlock_testament(&self) -> Result<WriteReceipt, GatewayError> {
        self.submit(ContractWrite::UnlockTestament).await
    }

    async fn submit(&self, write: ContractWrite) -> Result<WriteReceipt, GatewayError> {
        let account = self.current_account().await?;

        info!("[{}] submitting from {}", write, account);
        let pending = self
            .ledger
            .send(&account, write)
            .await
            .map_err(|e| write_error(write, e))?;

        debug!("[{}] waiting for finality of {}", write, pending.tx_hash);
        let wait = self.ledger.wait_for_finality(&pending);
        let receipt = match self.finality_timeout {
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(result) => result,
                Err(_) => {
                    error!(
                        "[{}] {} not final after {:?}",
                        write, pending.tx_hash, limit
                    );
                    return Err(GatewayError::Timeout {
                        after_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    });
                },
            },
            None => wait.await,
        }
        .map_err(|e| write_error(write, e))?;

        info!(
            "[{}] {} final in block {:?}",
            write, receipt.tx_hash, receipt.block_number
        );
        Ok(receipt)
    }
}

fn write_error(write: ContractWrite, e: LedgerError) -> GatewayError {
    error!("[{}] write failed: {}", write, e);
    match e {
        LedgerError::Rejected => GatewayError::WriteRejected,
        other => GatewayError::WriteFailed(other.to_string()),
    }
}
