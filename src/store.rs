//! Credential store interface
//!
//! The guard and gate only ever read or write identities through this trait.
//! `LmdbStore` in [`crate::db`] is the bundled implementation.

use crate::error::Result;
use crate::identity::{Identity, IdentityStatus, NewIdentity};
use crate::permissions::{PermissionSet, Vocabulary};

pub trait CredentialStore: Send + Sync {
    /// Look up by mobile number or email
    fn find_by_identifier(&self, identifier: &str) -> Result<Option<Identity>>;

    fn find_by_id(&self, id: u64) -> Result<Option<Identity>>;

    /// Replace the whole permission set in one write. Returns false if `id` is unknown.
    fn update_permissions(&self, id: u64, permissions: &PermissionSet) -> Result<bool>;

    /// Returns false if `id` is unknown.
    fn update_status(&self, id: u64, status: IdentityStatus) -> Result<bool>;

    /// Fails with `StoreError::Conflict` if the mobile number or email is taken.
    fn create_identity(&self, new: NewIdentity) -> Result<Identity>;

    fn list_identities(&self) -> Result<Vec<Identity>>;

    /// Current grantable vocabulary
    fn vocabulary(&self) -> Result<Vocabulary>;
}
