use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Set of user identifiers, stored in the database as a JSON array.
/// Used for per-message delete-sets and per-thread hide-sets, where
/// membership must be idempotent: adding a user twice is the same as
/// adding them once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdSet(BTreeSet<String>);

impl IdSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an identifier. Returns true if it was not already present.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.0.insert(id.into())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
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
}

impl FromIterator<String> for IdSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent() {
        let mut set = IdSet::new();
        assert!(set.insert("u1"));
        assert!(!set.insert("u1"));
        assert_eq!(set.len(), 1);
        assert!(set.contains("u1"));
        assert!(!set.contains("u2"));
    }

    #[test]
    fn round_trips_as_json_array() {
        let mut set = IdSet::new();
        set.insert("b");
        set.insert("a");
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["a","b"]"#);
        let back: IdSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn empty_set_is_empty_array() {
        let set: IdSet = serde_json::from_str("[]").unwrap();
        assert!(set.is_empty());
    }
}
