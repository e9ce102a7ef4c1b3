use crate::types::{AccountAddress, ContractSnapshot, Field, Role};

/// Derive the role of `account` against `snapshot`.
///
/// Precedence is heir, then notary, then testator: a misconfigured contract
/// assigning one address to several parties always resolves to the first
/// match. Fields that are not fetched or undefined never match.
pub fn derive_role(account: &AccountAddress, snapshot: &ContractSnapshot) -> Role {
    let matches = |field: &Field<AccountAddress>| field.value() == Some(account);

    if matches(&snapshot.heir) {
        Role::Heir
    } else if matches(&snapshot.notary) {
        Role::Notary
    } else if matches(&snapshot.testator) {
        Role::Testator
    } else {
        Role::Unknown
    }
}
