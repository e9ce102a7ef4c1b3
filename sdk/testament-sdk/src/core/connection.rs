use crate::types::AccountAddress;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// The six read entry points of the testament contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractRead {
    Heir,
    Notary,
    Testator,
    IsDeceased,
    UnlockTime,
    DocumentHash,
}

impl ContractRead {
    pub const ALL: [ContractRead; 6] = [
        ContractRead::Heir,
        ContractRead::Notary,
        ContractRead::Testator,
        ContractRead::IsDeceased,
        ContractRead::UnlockTime,
        ContractRead::DocumentHash,
    ];

    /// Solidity function name of the read.
    pub fn function_name(&self) -> &'static str {
        match self {
            ContractRead::Heir => "heir",
            ContractRead::Notary => "notary",
            ContractRead::Testator => "testator",
            ContractRead::IsDeceased => "isDeceased",
            ContractRead::UnlockTime => "unlockTime",
            ContractRead::DocumentHash => "getDocumentHash",
        }
    }
}

impl fmt::Display for ContractRead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.function_name())
    }
}

/// The two state-changing entry points of the testament contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractWrite {
    ConfirmDeath,
    UnlockTestament,
}

impl ContractWrite {
    pub fn function_name(&self) -> &'static str {
        match self {
            ContractWrite::ConfirmDeath => "confirmDeath",
            ContractWrite::UnlockTestament => "unlockTestament",
        }
    }
}

impl fmt::Display for ContractWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.function_name())
    }
}

/// Decoded return value of a read call, un-normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerValue {
    Address(String),
    Bool(bool),
    Uint(u64),
    Text(String),
}

/// Handle of a submitted write that has not been awaited to finality yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    pub write: ContractWrite,
    pub tx_hash: String,
}

/// Proof that a write has been included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    pub tx_hash: String,
    pub block_number: Option<u64>,
}

/// Errors raised at the transport seam.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// No wallet or endpoint to talk to
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// The account holder declined the request
    #[error("request rejected by the account holder")]
    Rejected,

    /// The transaction was included but reverted
    #[error("transaction {0} reverted")]
    Reverted(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),
}

/// Abstraction over the ledger hosting the testament contract.
///
/// Implementations talk to one fixed contract address. This allows the
/// gateway to work with:
/// 1. A JSON-RPC endpoint with node-managed accounts (see `AlloyLedger`)
/// 2. Scripted in-memory ledgers in tests
#[async_trait]
pub trait TestamentLedger: Send + Sync {
    /// Ask the wallet for account access (`eth_requestAccounts`).
    async fn request_accounts(&self) -> Result<Vec<String>, LedgerError>;

    /// Issue one read-only call from `from`.
    async fn call(
        &self,
        from: &AccountAddress,
        read: ContractRead,
    ) -> Result<LedgerValue, LedgerError>;

    /// Submit a write. Returns as soon as the transaction is accepted.
    async fn send(
        &self,
        from: &AccountAddress,
        write: ContractWrite,
    ) -> Result<PendingWrite, LedgerError>;

    /// Wait until `pending` is included with the required confirmations.
    async fn wait_for_finality(&self, pending: &PendingWrite) -> Result<WriteReceipt, LedgerError>;
}
