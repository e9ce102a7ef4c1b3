use crate::basic::gateway::ContractGateway;
use crate::basic::role::derive_role;
use crate::core::connection::TestamentLedger;
use crate::error::{CoordinatorError, GatewayError, Result};
use crate::types::{
    AccountAddress, ContractSnapshot, Field, ReadWarning, ReconcileReport, Role, SnapshotField,
};
use crate::utils::{normalize_address, normalize_text};
use log::{debug, info, warn};
use std::fmt;
use tokio::sync::Mutex;

const CONFIRM_DEATH: &str = "confirm death";
const UNLOCK_TESTAMENT: &str = "unlock testament";

/// Lifecycle of the coordinator.
///
/// `Disconnected` and `Ready` are stable; every other state is transient and
/// has exactly one success and one failure edge back to a stable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WorkflowState {
    #[default]
    Disconnected,
    Connecting,
    /// Session open, snapshot pending
    Connected,
    Ready,
    ConfirmingDeath,
    UnlockingTestament,
}

impl WorkflowState {
    pub fn is_stable(&self) -> bool {
        matches!(self, WorkflowState::Disconnected | WorkflowState::Ready)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowState::Disconnected => "disconnected",
            WorkflowState::Connecting => "connecting",
            WorkflowState::Connected => "connected, snapshot pending",
            WorkflowState::Ready => "ready",
            WorkflowState::ConfirmingDeath => "confirming death",
            WorkflowState::UnlockingTestament => "unlocking testament",
        };
        f.write_str(name)
    }
}

/// Read-only state exposed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestamentView {
    pub account: Option<AccountAddress>,
    pub role: Role,
    pub snapshot: ContractSnapshot,
    pub state: WorkflowState,
    pub unlock_result: Option<String>,
    /// Failed reads of the last reconciliation
    pub warnings: Vec<ReadWarning>,
    pub last_failure: Option<CoordinatorError>,
}

impl TestamentView {
    /// Check if the confirm-death command would pass its guards
    pub fn can_confirm_death(&self) -> bool {
        self.state == WorkflowState::Ready
            && self.role == Role::Notary
            && self.snapshot.is_deceased() == Some(false)
    }

    /// Check if the unlock command would pass its guards
    pub fn can_unlock_testament(&self) -> bool {
        self.state == WorkflowState::Ready
            && self.role == Role::Heir
            && self.snapshot.is_deceased() == Some(true)
    }
}

#[derive(Debug, Default)]
struct CoordinatorInner {
    state: WorkflowState,
    account: Option<AccountAddress>,
    snapshot: ContractSnapshot,
    role: Role,
    unlock_result: Option<String>,
    warnings: Vec<ReadWarning>,
    last_failure: Option<CoordinatorError>,
}

impl CoordinatorInner {
    fn fail(&mut self, err: CoordinatorError) -> CoordinatorError {
        warn!("[coordinator] {} (state: {})", err, self.state);
        self.last_failure = Some(err.clone());
        err
    }

    fn transition(&mut self, to: WorkflowState) {
        debug!("[coordinator] {} -> {}", self.state, to);
        self.state = to;
    }
}

/// Role and state coordinator on top of a [`ContractGateway`].
///
/// Commands take `&self`; the internal lock is never held across a ledger
/// round trip, so a command issued while another one is in flight observes
/// the transient state and is rejected instead of queued.
pub struct Coordinator<L> {
    gateway: ContractGateway<L>,
    inner: Mutex<CoordinatorInner>,
}

impl<L: TestamentLedger> Coordinator<L> {
    pub fn new(gateway: ContractGateway<L>) -> Self {
        Self {
            gateway,
            inner: Mutex::new(CoordinatorInner::default()),
        }
    }

    pub fn gateway(&self) -> &ContractGateway<L> {
        &self.gateway
    }

    pub async fn state(&self) -> WorkflowState {
        self.inner.lock().await.state
    }

    /// Current role, recomputed at every reconciliation
    pub async fn role(&self) -> Role {
        self.inner.lock().await.role
    }

    pub async fn view(&self) -> TestamentView {
        let inner = self.inner.lock().await;
        TestamentView {
            account: inner.account.clone(),
            role: inner.role,
            snapshot: inner.snapshot.clone(),
            state: inner.state,
            unlock_result: inner.unlock_result.clone(),
            warnings: inner.warnings.clone(),
            last_failure: inner.last_failure.clone(),
        }
    }

    //=========================================================================
    // Session lifecycle
    //=========================================================================

    /// Open (or reopen) the session and reconcile the snapshot.
    ///
    /// A new session clears any previous unlock result. If the wallet refuses,
    /// the coordinator returns to the stable state it was in.
    pub async fn connect(&self) -> Result<ReconcileReport> {
        let previous = {
            let mut inner = self.inner.lock().await;
            if !inner.state.is_stable() {
                let state = inner.state;
                return Err(inner.fail(CoordinatorError::WorkflowInProgress { state }));
            }
            let previous = inner.state;
            inner.transition(WorkflowState::Connecting);
            previous
        };

        let session = match self.gateway.connect().await {
            Ok(session) => session,
            Err(e) => {
                let mut inner = self.inner.lock().await;
                inner.transition(previous);
                return Err(inner.fail(e.into()));
            },
        };

        {
            let mut inner = self.inner.lock().await;
            inner.account = Some(session.account.clone());
            inner.unlock_result = None;
            inner.last_failure = None;
            inner.transition(WorkflowState::Connected);
        }

        Ok(self.reconcile().await)
    }

    /// Close the session and forget everything derived from it.
    pub async fn disconnect(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.state.is_stable() {
            let state = inner.state;
            return Err(inner.fail(CoordinatorError::WorkflowInProgress { state }));
        }
        // no ledger round trip here, only the session slot
        self.gateway.disconnect().await;
        *inner = CoordinatorInner::default();
        info!("[coordinator] disconnected");
        Ok(())
    }

    //=========================================================================
    // Reconciliation
    //=========================================================================

    /// Issue the six reads and derive the role once all of them settled.
    ///
    /// Must be entered in `Connected`. A failed read keeps the previous value
    /// of its field and is reported as a warning.
    async fn reconcile(&self) -> ReconcileReport {
        let previous = self.inner.lock().await.snapshot.clone();
        debug!("[reconcile] fetching contract state");

        let (heir, notary, testator, deceased, unlock_timestamp, document_hash) = tokio::join!(
            self.gateway.read_heir(),
            self.gateway.read_notary(),
            self.gateway.read_testator(),
            self.gateway.read_deceased(),
            self.gateway.read_unlock_timestamp(),
            self.gateway.read_document_hash(),
        );

        let mut warnings = Vec::new();
        let snapshot = ContractSnapshot {
            heir: settle(
                SnapshotField::Heir,
                heir.map(|raw| normalize_address(&raw)),
                &previous.heir,
                &mut warnings,
            ),
            notary: settle(
                SnapshotField::Notary,
                notary.map(|raw| normalize_address(&raw)),
                &previous.notary,
                &mut warnings,
            ),
            testator: settle(
                SnapshotField::Testator,
                testator.map(|raw| normalize_address(&raw)),
                &previous.testator,
                &mut warnings,
            ),
            deceased: settle(
                SnapshotField::Deceased,
                deceased.map(Field::Value),
                &previous.deceased,
                &mut warnings,
            ),
            unlock_timestamp: settle(
                SnapshotField::UnlockTimestamp,
                unlock_timestamp.map(Field::Value),
                &previous.unlock_timestamp,
                &mut warnings,
            ),
            document_hash: settle(
                SnapshotField::DocumentHash,
                document_hash.map(|raw| normalize_text(&raw)),
                &previous.document_hash,
                &mut warnings,
            ),
        };

        let mut inner = self.inner.lock().await;
        let role = inner
            .account
            .as_ref()
            .map(|account| derive_role(account, &snapshot))
            .unwrap_or_default();

        info!(
            "[reconcile] role={} deceased={} unlock_time={} warnings={}",
            role,
            snapshot.deceased,
            snapshot.unlock_timestamp,
            warnings.len()
        );

        inner.snapshot = snapshot.clone();
        inner.role = role;
        inner.warnings = warnings.clone();
        inner.transition(WorkflowState::Ready);

        ReconcileReport {
            snapshot,
            role,
            warnings,
        }
    }

    //=========================================================================
    // Workflows
    //=========================================================================

    /// Notary: confirm the testator's death, then re-read the whole contract.
    ///
    /// The deceased flag is never set locally; it comes from the full
    /// reconciliation that follows finality.
    pub async fn confirm_death(&self) -> Result<ReconcileReport> {
        self.enter(WorkflowState::ConfirmingDeath).await?;

        match self.gateway.submit_confirm_death().await {
            Ok(receipt) => {
                info!("[confirm_death] confirmed in {}", receipt.tx_hash);
                self.inner
                    .lock()
                    .await
                    .transition(WorkflowState::Connected);
                Ok(self.reconcile().await)
            },
            Err(e) => Err(self.abort(e).await),
        }
    }

    /// Heir: unlock the testament and fetch the document hash.
    pub async fn unlock_testament(&self) -> Result<String> {
        self.enter(WorkflowState::UnlockingTestament).await?;

        if let Err(e) = self.gateway.submit_unlock_testament().await {
            return Err(self.abort(e).await);
        }

        let raw = match self.gateway.read_document_hash().await {
            Ok(raw) => raw,
            Err(e) => return Err(self.abort(e).await),
        };

        let mut inner = self.inner.lock().await;
        let document_hash = normalize_text(&raw);
        inner.snapshot = inner.snapshot.with_document_hash(document_hash.clone());
        inner.transition(WorkflowState::Ready);

        match document_hash {
            Field::Value(hash) => {
                info!("[unlock_testament] document {}", hash);
                inner.unlock_result = Some(hash.clone());
                Ok(hash)
            },
            _ => Err(inner.fail(CoordinatorError::DocumentUnavailable)),
        }
    }

    /// Check guards and move from `Ready` into `workflow`.
    async fn enter(&self, workflow: WorkflowState) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let action = match workflow {
            WorkflowState::ConfirmingDeath => CONFIRM_DEATH,
            _ => UNLOCK_TESTAMENT,
        };

        let current = inner.state;
        match current {
            WorkflowState::Ready => {},
            WorkflowState::Disconnected => {
                return Err(inner.fail(CoordinatorError::NotPermitted {
                    action,
                    reason: "no active session".to_string(),
                }));
            },
            state => return Err(inner.fail(CoordinatorError::WorkflowInProgress { state })),
        }

        let (required_role, required_deceased) = match workflow {
            WorkflowState::ConfirmingDeath => (Role::Notary, false),
            _ => (Role::Heir, true),
        };

        if inner.role != required_role {
            let reason = format!("role is {}, {} required", inner.role, required_role);
            return Err(inner.fail(CoordinatorError::NotPermitted { action, reason }));
        }

        match inner.snapshot.is_deceased() {
            Some(flag) if flag == required_deceased => {},
            Some(true) => {
                return Err(inner.fail(CoordinatorError::NotPermitted {
                    action,
                    reason: "death already confirmed".to_string(),
                }));
            },
            Some(false) => {
                return Err(inner.fail(CoordinatorError::NotPermitted {
                    action,
                    reason: "death not confirmed".to_string(),
                }));
            },
            None => {
                let reason = format!("deceased flag is {}", inner.snapshot.deceased);
                return Err(inner.fail(CoordinatorError::NotPermitted { action, reason }));
            },
        }

        inner.last_failure = None;
        inner.transition(workflow);
        Ok(())
    }

    /// Failure edge of both workflows: back to `Ready`, snapshot untouched.
    async fn abort(&self, e: GatewayError) -> CoordinatorError {
        let mut inner = self.inner.lock().await;
        inner.transition(WorkflowState::Ready);
        inner.fail(e.into())
    }
}

fn settle<T: Clone>(
    field: SnapshotField,
    result: std::result::Result<Field<T>, GatewayError>,
    previous: &Field<T>,
    warnings: &mut Vec<ReadWarning>,
) -> Field<T> {
    match result {
        Ok(value) => value,
        Err(error) => {
            warn!("[reconcile] {} read failed, keeping previous value", field);
            warnings.push(ReadWarning { field, error });
            previous.clone()
        },
    }
}
