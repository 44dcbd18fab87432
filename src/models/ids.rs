//! Opaque store-assigned document identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A document id assigned by the backing store.
///
/// Ids are opaque keys: nothing is derived from their content, and they
/// are only ever compared for equality or used as map keys.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    /// Wrap an existing id string.
    pub fn new(id: String) -> Self {
        Self(id)
    }

    /// Generate a fresh random id (used by the in-memory store).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocId({})", self.0)
    }
}

impl From<String> for DocId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DocId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Type alias for match document ids.
pub type MatchId = DocId;

/// Type alias for participant document ids.
pub type ParticipantId = DocId;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_id_generate_unique() {
        let id1 = DocId::generate();
        let id2 = DocId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_doc_id_from_str() {
        let id = DocId::from("match-1");
        assert_eq!(id.as_str(), "match-1");
    }

    #[test]
    fn test_doc_id_display() {
        let id = DocId::new("abc123".to_string());
        assert_eq!(format!("{}", id), "abc123");
    }

    #[test]
    fn test_doc_id_debug() {
        let id = DocId::from("debug-test");
        assert!(format!("{:?}", id).contains("debug-test"));
    }

    #[test]
    fn test_doc_id_serialization_transparent() {
        let id = DocId::from("plain");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"plain\"");
        let back: DocId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn test_doc_id_equality() {
        assert_eq!(DocId::from("same"), DocId::from("same"));
        assert_ne!(DocId::from("same"), DocId::from("other"));
    }
}
