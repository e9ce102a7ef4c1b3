use crate::basic::coordinator::WorkflowState;
use crate::core::connection::ContractRead;
use thiserror::Error;

/// Typed failures of the session/contract gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// No wallet to request account access from
    #[error("wallet unavailable: {0}")]
    WalletUnavailable(String),

    /// Account access was declined
    #[error("account access rejected by the user")]
    UserRejected,

    /// A contract call was attempted without an active session
    #[error("contract unavailable: no active session")]
    ContractUnavailable,

    #[error("read {read} failed: {cause}")]
    ReadFailed { read: ContractRead, cause: String },

    /// The transaction was declined in the wallet
    #[error("transaction rejected by the user")]
    WriteRejected,

    /// Transport failure or contract revert
    #[error("transaction failed: {0}")]
    WriteFailed(String),

    #[error("transaction not final after {after_ms}ms")]
    Timeout { after_ms: u64 },
}

/// Failures surfaced by the coordinator to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Another command is still running
    #[error("another operation is in progress ({state})")]
    WorkflowInProgress { state: WorkflowState },

    /// The role or contract state does not allow the command
    #[error("{action} not permitted: {reason}")]
    NotPermitted {
        action: &'static str,
        reason: String,
    },

    /// Unlock succeeded but the contract returned no document
    #[error("testament unlocked but no document hash is available")]
    DocumentUnavailable,
}

/// Result type alias for coordinator commands
pub type Result<T> = std::result::Result<T, CoordinatorError>;
