//! Permission evaluation
//!
//! Pure decisions over a held permission set. The wildcard only has meaning on
//! the held side: asking whether `*` is allowed is the same as asking whether
//! `*` is held.

use crate::error::PermissionDenied;
use crate::permissions::PermissionSet;

/// True iff `required` is held or the wildcard is held.
#[inline]
pub fn allows(held: &PermissionSet, required: &str) -> bool {
    held.has_wildcard() || held.contains(required)
}

/// True iff the wildcard is held or at least one of `required` is held.
/// An empty requirement is denied unless the wildcard is held.
pub fn allows_any<'a, I>(held: &PermissionSet, required: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    held.has_wildcard() || required.into_iter().any(|p| held.contains(p))
}

/// True iff the wildcard is held or every one of `required` is held.
pub fn allows_all<'a, I>(held: &PermissionSet, required: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    held.has_wildcard() || required.into_iter().all(|p| held.contains(p))
}

/// Required permissions absent from `held`; empty when the wildcard is held.
pub fn missing<'a, I>(held: &PermissionSet, required: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    if held.has_wildcard() {
        return Vec::new();
    }
    required.into_iter().filter(|p| !held.contains(p)).map(str::to_string).collect()
}

/// A route's declared permission requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    One(String),
    AnyOf(Vec<String>),
    AllOf(Vec<String>),
}

impl Requirement {
    pub fn one(permission: impl Into<String>) -> Self {
        Self::One(permission.into())
    }

    pub fn any_of<S: Into<String>>(permissions: impl IntoIterator<Item = S>) -> Self {
        Self::AnyOf(permissions.into_iter().map(Into::into).collect())
    }

    pub fn all_of<S: Into<String>>(permissions: impl IntoIterator<Item = S>) -> Self {
        Self::AllOf(permissions.into_iter().map(Into::into).collect())
    }

    fn names(&self) -> Vec<&str> {
        match self {
            Self::One(p) => vec![p.as_str()],
            Self::AnyOf(ps) | Self::AllOf(ps) => ps.iter().map(String::as_str).collect(),
        }
    }

    /// Evaluate against `held`, naming what is missing on denial.
    ///
    /// For `AnyOf` every listed permission is reported, since holding any one
    /// of them would have been enough.
    pub fn check(&self, held: &PermissionSet) -> Result<(), PermissionDenied> {
        let names = self.names();
        let allowed = match self {
            Self::One(p) => allows(held, p),
            Self::AnyOf(_) => allows_any(held, names.iter().copied()),
            Self::AllOf(_) => allows_all(held, names.iter().copied()),
        };
        if allowed {
            return Ok(());
        }
        Err(PermissionDenied { missing: missing(held, names) })
    }
}
