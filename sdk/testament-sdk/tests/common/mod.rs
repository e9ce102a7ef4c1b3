#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use testament_sdk::{
    AccountAddress, ContractGateway, ContractRead, ContractWrite, Coordinator, LedgerError,
    LedgerValue, PendingWrite, TestamentLedger, WriteReceipt,
};
use tokio::sync::Notify;

pub const HEIR: &str = "0xHEIR";
pub const NOTARY: &str = "0xNotary";
pub const TESTATOR: &str = "0xTestator";
pub const UNLOCK_TIME: u64 = 1_767_225_600;

/// Ordered record of what reached the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Call(ContractRead),
    Send(ContractWrite),
    Final(ContractWrite),
}

/// In-memory ledger with scripted answers.
///
/// Writes apply their registered effects only once they become final, like
/// a real chain where state changes are visible after inclusion.
pub struct ScriptedLedger {
    accounts: Mutex<Result<Vec<String>, LedgerError>>,
    values: Mutex<HashMap<ContractRead, Result<LedgerValue, LedgerError>>>,
    effects: HashMap<ContractWrite, Vec<(ContractRead, LedgerValue)>>,
    send_error: Mutex<Option<LedgerError>>,
    finality_error: Mutex<Option<LedgerError>>,
    finality_gate: Option<Arc<Notify>>,
    read_gate: Mutex<Option<Arc<Notify>>>,
    events: Mutex<Vec<Event>>,
    nonce: AtomicU64,
}

impl ScriptedLedger {
    /// Testament with the default parties, testator alive, document locked
    pub fn new(account: &str) -> Self {
        let mut values = HashMap::new();
        values.insert(ContractRead::Heir, Ok(LedgerValue::Address(HEIR.into())));
        values.insert(ContractRead::Notary, Ok(LedgerValue::Address(NOTARY.into())));
        values.insert(
            ContractRead::Testator,
            Ok(LedgerValue::Address(TESTATOR.into())),
        );
        values.insert(ContractRead::IsDeceased, Ok(LedgerValue::Bool(false)));
        values.insert(ContractRead::UnlockTime, Ok(LedgerValue::Uint(UNLOCK_TIME)));
        values.insert(ContractRead::DocumentHash, Ok(LedgerValue::Text(String::new())));

        Self {
            accounts: Mutex::new(Ok(vec![account.to_string()])),
            values: Mutex::new(values),
            effects: HashMap::new(),
            send_error: Mutex::new(None),
            finality_error: Mutex::new(None),
            finality_gate: None,
            read_gate: Mutex::new(None),
            events: Mutex::new(Vec::new()),
            nonce: AtomicU64::new(0),
        }
    }

    pub fn with_accounts_error(self, error: LedgerError) -> Self {
        *self.accounts.lock().unwrap() = Err(error);
        self
    }

    pub fn with_value(self, read: ContractRead, value: LedgerValue) -> Self {
        self.set_value(read, value);
        self
    }

    pub fn with_read_error(self, read: ContractRead, error: LedgerError) -> Self {
        self.values.lock().unwrap().insert(read, Err(error));
        self
    }

    pub fn with_deceased(self, deceased: bool) -> Self {
        self.with_value(ContractRead::IsDeceased, LedgerValue::Bool(deceased))
    }

    pub fn with_effect(
        mut self,
        write: ContractWrite,
        read: ContractRead,
        value: LedgerValue,
    ) -> Self {
        self.effects.entry(write).or_default().push((read, value));
        self
    }

    pub fn with_send_error(self, error: LedgerError) -> Self {
        *self.send_error.lock().unwrap() = Some(error);
        self
    }

    pub fn with_finality_error(self, error: LedgerError) -> Self {
        *self.finality_error.lock().unwrap() = Some(error);
        self
    }

    /// Hold every finality wait until `gate` is notified
    pub fn with_finality_gate(mut self, gate: Arc<Notify>) -> Self {
        self.finality_gate = Some(gate);
        self
    }

    /// Hold every read issued from now on until `gate` is notified.
    /// The call is recorded before it blocks.
    pub fn set_read_gate(&self, gate: Arc<Notify>) {
        *self.read_gate.lock().unwrap() = Some(gate);
    }

    pub fn set_value(&self, read: ContractRead, value: LedgerValue) {
        self.values.lock().unwrap().insert(read, Ok(value));
    }

    pub fn set_read_error(&self, read: ContractRead, error: LedgerError) {
        self.values.lock().unwrap().insert(read, Err(error));
    }

    pub fn set_accounts(&self, accounts: Vec<&str>) {
        *self.accounts.lock().unwrap() = Ok(accounts.into_iter().map(String::from).collect());
    }

    pub fn set_accounts_error(&self, error: LedgerError) {
        *self.accounts.lock().unwrap() = Err(error);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear_events(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn read_count(&self, read: ContractRead) -> usize {
        self.events()
            .iter()
            .filter(|e| **e == Event::Call(read))
            .count()
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl TestamentLedger for ScriptedLedger {
    async fn request_accounts(&self) -> Result<Vec<String>, LedgerError> {
        self.accounts.lock().unwrap().clone()
    }

    async fn call(
        &self,
        _from: &AccountAddress,
        read: ContractRead,
    ) -> Result<LedgerValue, LedgerError> {
        self.record(Event::Call(read));
        let gate = self.read_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.values
            .lock()
            .unwrap()
            .get(&read)
            .cloned()
            .unwrap_or_else(|| Err(LedgerError::Transport(format!("no value for {}", read))))
    }

    async fn send(
        &self,
        _from: &AccountAddress,
        write: ContractWrite,
    ) -> Result<PendingWrite, LedgerError> {
        self.record(Event::Send(write));
        if let Some(error) = self.send_error.lock().unwrap().clone() {
            return Err(error);
        }
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        Ok(PendingWrite {
            write,
            tx_hash: format!("0x{:064x}", nonce + 1),
        })
    }

    async fn wait_for_finality(&self, pending: &PendingWrite) -> Result<WriteReceipt, LedgerError> {
        if let Some(gate) = &self.finality_gate {
            gate.notified().await;
        }
        if let Some(error) = self.finality_error.lock().unwrap().clone() {
            return Err(error);
        }

        if let Some(effects) = self.effects.get(&pending.write) {
            for (read, value) in effects {
                self.set_value(*read, value.clone());
            }
        }
        self.record(Event::Final(pending.write));

        Ok(WriteReceipt {
            tx_hash: pending.tx_hash.clone(),
            block_number: Some(42),
        })
    }
}

pub fn coordinator(ledger: ScriptedLedger) -> Coordinator<ScriptedLedger> {
    Coordinator::new(ContractGateway::new(ledger))
}

pub fn ledger(coordinator: &Coordinator<ScriptedLedger>) -> &ScriptedLedger {
    coordinator.gateway().ledger()
}
