pub mod advanced;
pub mod basic;
pub mod config;
pub mod core;
pub mod error;
pub mod types;
pub mod utils;

pub use crate::advanced::ledger::AlloyLedger;
pub use crate::basic::coordinator::{Coordinator, TestamentView, WorkflowState};
pub use crate::basic::gateway::ContractGateway;
pub use crate::basic::role::derive_role;
pub use crate::config::TestamentConfig;
pub use crate::core::connection::{
    ContractRead, ContractWrite, LedgerError, LedgerValue, PendingWrite, TestamentLedger,
    WriteReceipt,
};
pub use crate::error::{CoordinatorError, GatewayError, Result};
pub use crate::types::{
    AccountAddress, ContractSnapshot, Field, ReadWarning, ReconcileReport, Role, Session,
    SnapshotField,
};
