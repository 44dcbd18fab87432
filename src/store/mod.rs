//! Document store boundary.
//!
//! The store itself is an external dependency; this module defines the
//! interface the core consumes: filtered/sorted/limited match queries, a
//! per-match child-collection fetch, and the writes used by the mutation
//! path. Composite indexes backing filter+sort combinations may be
//! temporarily unprovisioned, which the store signals with a
//! distinguishable [`StoreError::MissingIndex`].

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::models::{DocId, Document, StoredDoc};

/// Errors raised by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The query requires a composite index that is not provisioned.
    /// The planner falls back to an unindexed query on this error; it is
    /// never surfaced to callers.
    #[error("missing composite index for query: {0}")]
    MissingIndex(String),

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Sort direction for an ordered query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Ordering clause of a match query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: &'static str,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn asc(field: &'static str) -> Self {
        Self {
            field,
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(field: &'static str) -> Self {
        Self {
            field,
            direction: SortDirection::Descending,
        }
    }
}

/// Timestamp range filter. `start` is inclusive, `end` exclusive; the
/// planner widens inclusive calendar dates into this form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeFilter {
    pub field: &'static str,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// A filtered, optionally ordered, limited query against the match
/// collection.
#[derive(Debug, Clone, Default)]
pub struct MatchQuery {
    /// Equality filters, applied conjunctively.
    pub equality: Vec<(&'static str, Value)>,

    /// Optional timestamp range filter.
    pub range: Option<RangeFilter>,

    /// Optional ordering. Ordered queries require a composite index
    /// covering the equality fields plus the order field.
    pub order_by: Option<OrderBy>,

    /// Resume after this document id (cursor pagination).
    pub start_after: Option<DocId>,

    /// Maximum number of documents to return. 0 means no limit.
    pub limit: usize,
}

impl MatchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: &'static str, value: impl Into<Value>) -> Self {
        self.equality.push((field, value.into()));
        self
    }

    pub fn order(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// The document store consumed by the query planner, batch loader and
/// mutation path.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Execute a match query. Returns `StoreError::MissingIndex` when the
    /// query's filter+sort combination has no provisioned composite index.
    async fn query_matches(&self, query: &MatchQuery) -> Result<Vec<StoredDoc>, StoreError>;

    /// Fetch a single match document by id. Missing ids return `None`.
    async fn get_match(&self, id: &DocId) -> Result<Option<StoredDoc>, StoreError>;

    /// Fetch the participant child collection of one match, in storage
    /// order (callers sort).
    async fn list_participants(&self, match_id: &DocId) -> Result<Vec<StoredDoc>, StoreError>;

    /// Insert a match document together with its participant children.
    /// Returns the new match id.
    async fn insert_match(
        &self,
        doc: Document,
        participants: Vec<Document>,
    ) -> Result<DocId, StoreError>;

    /// Merge the given fields into a match document.
    async fn update_match(&self, id: &DocId, fields: Document) -> Result<(), StoreError>;

    /// Merge the given fields into a participant document.
    async fn update_participant(
        &self,
        match_id: &DocId,
        id: &DocId,
        fields: Document,
    ) -> Result<(), StoreError>;

    /// Permanently remove a match and all of its participants.
    async fn purge_match(&self, id: &DocId) -> Result<(), StoreError>;

    /// Fetch a player profile by normalized name. Missing names return
    /// `None`.
    async fn get_player_profile(&self, name: &str) -> Result<Option<Document>, StoreError>;

    /// Create or replace a player profile.
    async fn upsert_player_profile(&self, name: &str, doc: Document) -> Result<(), StoreError>;
}
