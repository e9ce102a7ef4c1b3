use crate::core::connection::{ContractRead, LedgerValue};
use crate::error::GatewayError;
use crate::types::{AccountAddress, Field};

//=============================================================================
// Raw Value Checks
//=============================================================================

fn unexpected(read: ContractRead, expected: &str, value: &LedgerValue) -> GatewayError {
    GatewayError::ReadFailed {
        read,
        cause: format!("expected {} value, got {:?}", expected, value),
    }
}

/// Extract an address return value
pub fn expect_address(read: ContractRead, value: LedgerValue) -> Result<String, GatewayError> {
    match value {
        LedgerValue::Address(addr) => Ok(addr),
        other => Err(unexpected(read, "address", &other)),
    }
}

/// Extract a bool return value
pub fn expect_bool(read: ContractRead, value: LedgerValue) -> Result<bool, GatewayError> {
    match value {
        LedgerValue::Bool(flag) => Ok(flag),
        other => Err(unexpected(read, "bool", &other)),
    }
}

/// Extract an integer return value
pub fn expect_uint(read: ContractRead, value: LedgerValue) -> Result<u64, GatewayError> {
    match value {
        LedgerValue::Uint(n) => Ok(n),
        other => Err(unexpected(read, "uint", &other)),
    }
}

/// Extract a string return value
pub fn expect_text(read: ContractRead, value: LedgerValue) -> Result<String, GatewayError> {
    match value {
        LedgerValue::Text(text) => Ok(text),
        other => Err(unexpected(read, "string", &other)),
    }
}

//=============================================================================
// Snapshot Normalization
//=============================================================================

/// Map a raw address to a snapshot field.
///
/// An empty value becomes `Undefined`; the zero address stays a value.
pub fn normalize_address(raw: &str) -> Field<AccountAddress> {
    if raw.trim().is_empty() {
        Field::Undefined
    } else {
        Field::Value(AccountAddress::new(raw))
    }
}

/// Map a raw string to a snapshot field, empty becomes `Undefined`
pub fn normalize_text(raw: &str) -> Field<String> {
    if raw.is_empty() {
        Field::Undefined
    } else {
        Field::Value(raw.to_string())
    }
}
