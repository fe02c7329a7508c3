//! assetgate - permission evaluation, delegation guard and token gate
//!
//! Identities hold a set of permission strings. The reserved `*` stands for
//! every permission, including ones added to the vocabulary later.
//!
//! - [`evaluator`]: allow/deny decisions over a held set
//! - [`delegation`]: who may replace whose permission set, and with what
//! - [`token`]: stateless signed session tokens
//! - [`gate`]: authenticate + authorize middleware (feature `server`)
//! - [`store`] / [`db`]: credential store trait and its LMDB implementation

pub mod constants;
pub mod db;
pub mod delegation;
pub mod error;
pub mod evaluator;
pub mod identity;
pub mod password;
pub mod permissions;
pub mod store;
pub mod token;

#[cfg(feature = "server")]
pub mod api_error;
#[cfg(feature = "server")]
pub mod config;
#[cfg(feature = "server")]
pub mod gate;
#[cfg(feature = "server")]
pub mod server;

pub use constants::WILDCARD;
pub use db::LmdbStore;
pub use delegation::{can_delegate, check_delegation};
pub use error::{AuthError, ConfigError, DelegationError, PermissionDenied, Result, StoreError};
pub use evaluator::{allows, allows_all, allows_any, missing, Requirement};
pub use identity::{Identity, IdentityStatus, NewIdentity, PublicIdentity, Registration};
pub use permissions::{PermissionInfo, PermissionSet, Vocabulary};
pub use store::CredentialStore;
pub use token::{Claims, TokenCodec};
