//! Delegation guard
//!
//! Decides whether a granter may replace a target's permission set. The checks
//! run in a fixed order and stop at the first failure:
//!
//! 1. granter and target are the same identity → `SelfModification`
//! 2. a requested token is outside the vocabulary → `UnknownPermission`
//! 3. the request is not a list of strings → `MalformedInput`
//! 4. granter holds `*` → allowed, whatever was requested
//! 5. `*` requested by a non-wildcard holder → `WildcardNotDelegable`
//! 6. a requested token the granter does not hold → `InsufficientDelegationRights`
//!
//! On success the caller overwrites the target's set with exactly the requested
//! tokens. Anything not listed is revoked, and an empty list revokes everything.
//!
//! The seeded `grant_permissions` term is not consulted: any authenticated
//! identity may ask, and check 6 limits it to what it already holds.

use serde_json::Value;

use crate::constants::WILDCARD;
use crate::error::DelegationError;
use crate::permissions::{PermissionSet, Vocabulary};

/// Validate a raw `permissionsToKeep` value and return the set to store.
pub fn can_delegate(
    granter_id: u64,
    granter_held: &PermissionSet,
    target_id: u64,
    requested: &Value,
    vocabulary: &Vocabulary,
) -> Result<PermissionSet, DelegationError> {
    if granter_id == target_id {
        return Err(DelegationError::SelfModification);
    }

    let tokens: Vec<&str> = match requested {
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        Value::String(s) => vec![s.as_str()],
        _ => Vec::new(),
    };
    reject_unknown(&tokens, vocabulary)?;

    let list = match requested {
        Value::Array(items) if items.iter().all(Value::is_string) => tokens,
        _ => return Err(DelegationError::MalformedInput),
    };

    authorize_grant(granter_held, &list)?;
    Ok(list.into_iter().collect())
}

/// Typed variant for callers that already hold a parsed set.
pub fn check_delegation(
    granter_id: u64,
    granter_held: &PermissionSet,
    target_id: u64,
    requested: &PermissionSet,
    vocabulary: &Vocabulary,
) -> Result<(), DelegationError> {
    if granter_id == target_id {
        return Err(DelegationError::SelfModification);
    }
    let list: Vec<&str> = requested.iter().collect();
    reject_unknown(&list, vocabulary)?;
    authorize_grant(granter_held, &list)
}

fn reject_unknown(tokens: &[&str], vocabulary: &Vocabulary) -> Result<(), DelegationError> {
    let mut unknown: Vec<String> = Vec::new();
    for t in tokens {
        if !vocabulary.contains(t) && !unknown.iter().any(|u| u == t) {
            unknown.push(t.to_string());
        }
    }
    if unknown.is_empty() { Ok(()) } else { Err(DelegationError::UnknownPermission(unknown)) }
}

fn authorize_grant(granter_held: &PermissionSet, requested: &[&str]) -> Result<(), DelegationError> {
    if granter_held.has_wildcard() {
        return Ok(());
    }
    if requested.contains(&WILDCARD) {
        return Err(DelegationError::WildcardNotDelegable);
    }
    match requested.iter().find(|p| !granter_held.contains(p)) {
        Some(p) => Err(DelegationError::InsufficientDelegationRights(p.to_string())),
        None => Ok(()),
    }
}
