//! In-memory document store.
//!
//! Backs the binary and the test suite. Matches are kept in insertion
//! (creation) order, participants as per-match child lists, and profiles
//! keyed by normalized player name. The set of provisioned composite
//! indexes is configurable so the planner's fallback path can be
//! exercised: an ordered query whose index is not provisioned fails with
//! [`StoreError::MissingIndex`], exactly like a store with index
//! provisioning lag.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::models::{datetime_field, DocId, Document, StoredDoc};

use super::{DocumentStore, MatchQuery, SortDirection, StoreError};

/// Which composite indexes the store has provisioned.
#[derive(Debug, Clone)]
enum IndexMode {
    /// Every filter+sort combination is served (fully provisioned store).
    All,
    /// Only the listed index keys are served.
    Only(HashSet<String>),
}

/// In-memory [`DocumentStore`] implementation.
pub struct MemoryStore {
    matches: RwLock<Vec<(DocId, Document)>>,
    participants: RwLock<HashMap<String, Vec<(DocId, Document)>>>,
    profiles: RwLock<HashMap<String, Document>>,
    indexes: IndexMode,
    match_queries: AtomicUsize,
    participant_fetches: AtomicUsize,
}

impl MemoryStore {
    /// Store with every composite index provisioned.
    pub fn new() -> Self {
        Self {
            matches: RwLock::new(Vec::new()),
            participants: RwLock::new(HashMap::new()),
            profiles: RwLock::new(HashMap::new()),
            indexes: IndexMode::All,
            match_queries: AtomicUsize::new(0),
            participant_fetches: AtomicUsize::new(0),
        }
    }

    /// Store with no composite indexes: every ordered query fails with
    /// `MissingIndex`, forcing the planner's fallback path.
    pub fn without_indexes() -> Self {
        Self {
            indexes: IndexMode::Only(HashSet::new()),
            ..Self::new()
        }
    }

    /// Store with only the given index keys provisioned (see
    /// [`MemoryStore::index_key`]).
    pub fn with_indexes<I: IntoIterator<Item = String>>(keys: I) -> Self {
        Self {
            indexes: IndexMode::Only(keys.into_iter().collect()),
            ..Self::new()
        }
    }

    /// The index key an ordered query requires: sorted filter fields plus
    /// the order field.
    pub fn index_key(query: &MatchQuery) -> String {
        let mut fields: Vec<&str> = query.equality.iter().map(|(f, _)| *f).collect();
        if let Some(ref range) = query.range {
            fields.push(range.field);
        }
        fields.sort_unstable();
        fields.dedup();
        let order_field = query.order_by.as_ref().map(|o| o.field).unwrap_or("");
        format!("{}+{}", fields.join(","), order_field)
    }

    /// Number of match queries executed (instrumentation).
    pub fn match_query_count(&self) -> usize {
        self.match_queries.load(Ordering::Relaxed)
    }

    /// Number of participant child fetches executed (instrumentation).
    pub fn participant_fetch_count(&self) -> usize {
        self.participant_fetches.load(Ordering::Relaxed)
    }

    fn index_available(&self, query: &MatchQuery) -> bool {
        match &self.indexes {
            IndexMode::All => true,
            IndexMode::Only(keys) => keys.contains(&Self::index_key(query)),
        }
    }

    fn matches_equality(doc: &Document, field: &str, expected: &Value) -> bool {
        doc.get(field).map(|v| v == expected).unwrap_or(false)
    }

    fn order_timestamp(doc: &Document, field: &str) -> DateTime<Utc> {
        // Documents missing the order field sort as the epoch, matching
        // the planner's in-memory comparator.
        datetime_field(doc, field).unwrap_or(DateTime::UNIX_EPOCH)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn query_matches(&self, query: &MatchQuery) -> Result<Vec<StoredDoc>, StoreError> {
        self.match_queries.fetch_add(1, Ordering::Relaxed);

        if query.order_by.is_some() && !self.index_available(query) {
            return Err(StoreError::MissingIndex(Self::index_key(query)));
        }

        let matches = self.matches.read().await;
        let mut selected: Vec<(DocId, Document)> = matches
            .iter()
            .filter(|(_, doc)| {
                query
                    .equality
                    .iter()
                    .all(|(field, value)| Self::matches_equality(doc, field, value))
            })
            .filter(|(_, doc)| match &query.range {
                Some(range) => match datetime_field(doc, range.field) {
                    // Range filters exclude documents without the field.
                    None => false,
                    Some(at) => {
                        range.start.map(|s| at >= s).unwrap_or(true)
                            && range.end.map(|e| at < e).unwrap_or(true)
                    }
                },
                None => true,
            })
            .cloned()
            .collect();

        if let Some(ref order) = query.order_by {
            match order.direction {
                SortDirection::Ascending => selected
                    .sort_by_key(|(_, doc)| Self::order_timestamp(doc, order.field)),
                SortDirection::Descending => {
                    selected.sort_by_key(|(_, doc)| {
                        std::cmp::Reverse(Self::order_timestamp(doc, order.field))
                    });
                }
            }
        }

        if let Some(ref cursor) = query.start_after {
            if let Some(pos) = selected.iter().position(|(id, _)| id == cursor) {
                selected.drain(..=pos);
            }
        }

        if query.limit > 0 {
            selected.truncate(query.limit);
        }

        Ok(selected
            .into_iter()
            .map(|(id, doc)| StoredDoc::new(id, doc))
            .collect())
    }

    async fn get_match(&self, id: &DocId) -> Result<Option<StoredDoc>, StoreError> {
        let matches = self.matches.read().await;
        Ok(matches
            .iter()
            .find(|(doc_id, _)| doc_id == id)
            .map(|(doc_id, doc)| StoredDoc::new(doc_id.clone(), doc.clone())))
    }

    async fn list_participants(&self, match_id: &DocId) -> Result<Vec<StoredDoc>, StoreError> {
        self.participant_fetches.fetch_add(1, Ordering::Relaxed);
        let participants = self.participants.read().await;
        Ok(participants
            .get(match_id.as_str())
            .map(|children| {
                children
                    .iter()
                    .map(|(id, doc)| StoredDoc::new(id.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert_match(
        &self,
        doc: Document,
        participants: Vec<Document>,
    ) -> Result<DocId, StoreError> {
        let id = DocId::generate();
        let children: Vec<(DocId, Document)> = participants
            .into_iter()
            .map(|mut child| {
                child.insert("matchId".into(), Value::from(id.as_str()));
                (DocId::generate(), child)
            })
            .collect();

        self.matches.write().await.push((id.clone(), doc));
        self.participants
            .write()
            .await
            .insert(id.as_str().to_string(), children);
        Ok(id)
    }

    async fn update_match(&self, id: &DocId, fields: Document) -> Result<(), StoreError> {
        let mut matches = self.matches.write().await;
        let entry = matches
            .iter_mut()
            .find(|(doc_id, _)| doc_id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        for (field, value) in fields {
            entry.1.insert(field, value);
        }
        Ok(())
    }

    async fn update_participant(
        &self,
        match_id: &DocId,
        id: &DocId,
        fields: Document,
    ) -> Result<(), StoreError> {
        let mut participants = self.participants.write().await;
        let children = participants
            .get_mut(match_id.as_str())
            .ok_or_else(|| StoreError::NotFound(match_id.to_string()))?;
        let entry = children
            .iter_mut()
            .find(|(doc_id, _)| doc_id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        for (field, value) in fields {
            entry.1.insert(field, value);
        }
        Ok(())
    }

    async fn purge_match(&self, id: &DocId) -> Result<(), StoreError> {
        let mut matches = self.matches.write().await;
        let before = matches.len();
        matches.retain(|(doc_id, _)| doc_id != id);
        if matches.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        // A match owns its participant list: purging the match removes
        // the children with it.
        self.participants.write().await.remove(id.as_str());
        Ok(())
    }

    async fn get_player_profile(&self, name: &str) -> Result<Option<Document>, StoreError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(name).cloned())
    }

    async fn upsert_player_profile(&self, name: &str, doc: Document) -> Result<(), StoreError> {
        self.profiles.write().await.insert(name.to_string(), doc);
        Ok(())
    }
}
