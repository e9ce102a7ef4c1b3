use crate::core::constants::UNDEFINED_SENTINEL;
use crate::error::GatewayError;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An account or contract address with case-insensitive identity.
///
/// The raw form is kept for display; equality and hashing use the lowercase
/// form so `0xABC` and `0xabc` are the same account.
#[derive(Debug, Clone, Eq)]
pub struct AccountAddress {
    raw: String,
    normalized: String,
}

impl AccountAddress {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into().trim().to_string();
        let normalized = raw.to_lowercase();
        Self { raw, normalized }
    }

    /// Address as returned by the ledger or wallet
    pub fn as_raw(&self) -> &str {
        &self.raw
    }

    /// Lowercase form used for comparison
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Check if this is the all-zero EVM address
    pub fn is_zero(&self) -> bool {
        let hex = self
            .normalized
            .strip_prefix("0x")
            .unwrap_or(&self.normalized);
        !hex.is_empty() && hex.chars().all(|c| c == '0')
    }

    /// Copy of this address in its lowercase form
    pub fn to_lowercase(&self) -> Self {
        Self {
            raw: self.normalized.clone(),
            normalized: self.normalized.clone(),
        }
    }
}

impl PartialEq for AccountAddress {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Hash for AccountAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for AccountAddress {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// One authenticated connection to the signer's account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Lowercase-normalized account
    pub account: AccountAddress,
    pub connected: bool,
}

impl Session {
    pub fn new(account: AccountAddress) -> Self {
        Self {
            account: account.to_lowercase(),
            connected: true,
        }
    }
}

/// Tri-state value of a snapshot field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Field<T> {
    /// No successful read yet
    #[default]
    NotFetched,
    /// The read succeeded but the contract holds nothing for this field
    Undefined,
    Value(T),
}

impl<T> Field<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_fetched(&self) -> bool {
        !matches!(self, Field::NotFetched)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Field::Undefined)
    }
}

impl<T: fmt::Display> fmt::Display for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::NotFetched => f.write_str("..."),
            Field::Undefined => f.write_str(UNDEFINED_SENTINEL),
            Field::Value(v) => v.fmt(f),
        }
    }
}

/// Names the fields of a [`ContractSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotField {
    Heir,
    Notary,
    Testator,
    Deceased,
    UnlockTimestamp,
    DocumentHash,
}

impl fmt::Display for SnapshotField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SnapshotField::Heir => "heir",
            SnapshotField::Notary => "notary",
            SnapshotField::Testator => "testator",
            SnapshotField::Deceased => "deceased",
            SnapshotField::UnlockTimestamp => "unlock_timestamp",
            SnapshotField::DocumentHash => "document_hash",
        };
        f.write_str(name)
    }
}

/// Reconciled view of the on-chain facts at one point in time.
///
/// Never mutated in place: reconciliation builds a new snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContractSnapshot {
    pub heir: Field<AccountAddress>,
    pub notary: Field<AccountAddress>,
    pub testator: Field<AccountAddress>,
    pub deceased: Field<bool>,
    /// Unix seconds, exactly as stored on-chain
    pub unlock_timestamp: Field<u64>,
    pub document_hash: Field<String>,
}

impl ContractSnapshot {
    /// Snapshot with every field `NotFetched`
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_deceased(&self) -> Option<bool> {
        self.deceased.value().copied()
    }

    /// Copy of this snapshot with a different document hash
    pub fn with_document_hash(&self, document_hash: Field<String>) -> Self {
        Self {
            document_hash,
            ..self.clone()
        }
    }
}

/// Classification of the session account against a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    Heir,
    Notary,
    Testator,
    #[default]
    Unknown,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Heir => "Heir",
            Role::Notary => "Notary",
            Role::Testator => "Testator",
            Role::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// A read that failed during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadWarning {
    pub field: SnapshotField,
    pub error: GatewayError,
}

impl fmt::Display for ReadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kept its previous value: {}", self.field, self.error)
    }
}

/// Outcome of one reconciliation fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub snapshot: ContractSnapshot,
    pub role: Role,
    pub warnings: Vec<ReadWarning>,
}

impl ReconcileReport {
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_equality_ignores_case() {
        let upper = AccountAddress::new("0xABCDEF0123");
        let lower = AccountAddress::new("0xabcdef0123");
        assert_eq!(upper, lower);
        assert_eq!(upper.as_raw(), "0xABCDEF0123");
        assert_eq!(upper.normalized(), "0xabcdef0123");
    }

    #[test]
    fn test_zero_address_is_a_value() {
        let zero = AccountAddress::new("0x0000000000000000000000000000000000000000");
        assert!(zero.is_zero());
        assert!(!AccountAddress::new("0x").is_zero());
        assert!(!AccountAddress::new("0xHeir").is_zero());

        let field = Field::Value(zero);
        assert!(!field.is_undefined());
        assert!(field.is_fetched());
    }

    #[test]
    fn test_field_display() {
        assert_eq!(Field::<u64>::NotFetched.to_string(), "...");
        assert_eq!(Field::<u64>::Undefined.to_string(), "Non défini");
        assert_eq!(Field::Value(42u64).to_string(), "42");
    }

    #[test]
    fn test_session_account_is_lowercase() {
        let session = Session::new(AccountAddress::new("0xAbC"));
        assert_eq!(session.account.as_raw(), "0xabc");
        assert!(session.connected);
    }
}
