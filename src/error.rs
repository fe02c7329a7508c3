//! Error types for assetgate

use thiserror::Error;

use crate::identity::IdentityStatus;

/// Authentication failures. Token and credential problems surface as 401.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("No token provided")]
    NoToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    ExpiredToken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("User is {0}, please contact an admin to activate the account")]
    Inactive(IdentityStatus),
    #[error("Token signing is not configured")]
    SigningUnavailable,
    #[error("Credential hashing failed")]
    Hashing,
}

/// The requester's permission set does not satisfy a route requirement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Forbidden: missing permission {}", .missing.join(", "))]
pub struct PermissionDenied {
    pub missing: Vec<String>,
}

/// Rejections from the delegation guard, in the order the guard checks them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DelegationError {
    #[error("You cannot update your own permissions")]
    SelfModification,
    #[error("Invalid permissions provided: {}", .0.join(", "))]
    UnknownPermission(Vec<String>),
    #[error("permissionsToKeep must be an array of strings")]
    MalformedInput,
    #[error("You cannot grant wildcard (*) permission")]
    WildcardNotDelegable,
    #[error("You do not have permission to grant {0}")]
    InsufficientDelegationRights(String),
    #[error("User to update not found")]
    TargetNotFound,
}

/// Credential store failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Backend(String),
    #[error("Corrupted record: {0}")]
    Corrupted(String),
    #[error("{0} already exists")]
    Conflict(String),
    #[error("Already bootstrapped")]
    AlreadyBootstrapped,
}

/// Invalid startup configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Configuration error: {0}")]
pub struct ConfigError(pub String);

/// Result type alias, defaulting to store failures
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Convert any backend error to StoreError
pub fn err<E: std::error::Error>(e: E) -> StoreError {
    StoreError::Backend(e.to_string())
}
