//! Permission sets and the administratively maintained vocabulary

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_VOCABULARY, WILDCARD};

/// Unordered, deduplicated set of permission tokens held by an identity.
///
/// The wildcard is stored as the literal `*` and is never expanded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wildcard() -> Self {
        Self::from_iter([WILDCARD])
    }

    #[inline]
    pub fn contains(&self, permission: &str) -> bool {
        self.0.contains(permission)
    }

    #[inline]
    pub fn has_wildcard(&self) -> bool {
        self.0.contains(WILDCARD)
    }

    pub fn insert(&mut self, permission: impl Into<String>) -> bool {
        self.0.insert(permission.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<'a> IntoIterator for &'a PermissionSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// One vocabulary entry as exposed by `GET /permissions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionInfo {
    pub name: String,
    pub description: Option<String>,
}

/// The set of permission names that may be granted.
///
/// Loaded from the credential store and handed to the delegation guard, so the
/// guard validates against exactly what the store seeds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    entries: BTreeMap<String, Option<String>>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in vocabulary, including the wildcard
    pub fn builtin() -> Self {
        DEFAULT_VOCABULARY
            .iter()
            .map(|(n, d)| PermissionInfo { name: n.to_string(), description: Some(d.to_string()) })
            .collect()
    }

    pub fn define(&mut self, name: impl Into<String>, description: Option<String>) {
        self.entries.insert(name.into(), description);
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> Vec<PermissionInfo> {
        self.entries
            .iter()
            .map(|(name, description)| PermissionInfo { name: name.clone(), description: description.clone() })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<PermissionInfo> for Vocabulary {
    fn from_iter<I: IntoIterator<Item = PermissionInfo>>(iter: I) -> Self {
        Self { entries: iter.into_iter().map(|p| (p.name, p.description)).collect() }
    }
}

impl<'a> FromIterator<&'a str> for Vocabulary {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self { entries: iter.into_iter().map(|n| (n.to_string(), None)).collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_deduplicates() {
        let set: PermissionSet = ["view_users", "view_users", "edit_users"].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_eq!(set.to_vec(), vec!["edit_users", "view_users"]);
    }

    #[test]
    fn set_serializes_as_array() {
        let set: PermissionSet = ["b", "a"].into_iter().collect();
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["a","b"]"#);
        let back: PermissionSet = serde_json::from_str(r#"["a","a","b"]"#).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn builtin_vocabulary_reserves_wildcard() {
        let v = Vocabulary::builtin();
        assert!(v.contains(WILDCARD));
        assert!(v.contains("grant_permissions"));
        assert!(!v.contains("launch_missiles"));
    }
}
