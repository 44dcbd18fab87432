//! Request-scoped fetch de-duplication.
//!
//! A [`RequestScope`] lives for one logical request (one aggregation call
//! graph) and memoizes completed-match fetches by their filter
//! parameters, so several aggregations computed for the same request hit
//! the store once. It has no TTL and no versioning; it is not the
//! result cache, and the two layers are deliberately independent.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::models::{AnalyticsFilters, MatchWithPlayers};
use crate::query::loader::find_with_participants;
use crate::store::{DocumentStore, StoreError};

/// Upper bound on records a single aggregation fetch will load. Call
/// sites bound total iteration with this cap rather than paginating.
pub const MAX_AGGREGATION_MATCHES: usize = 10_000;

/// Per-request memo of completed-match fetches.
#[derive(Default)]
pub struct RequestScope {
    fetches: Mutex<HashMap<String, Arc<Vec<MatchWithPlayers>>>>,
}

impl RequestScope {
    pub fn new() -> Self {
        Self::default()
    }

    fn fetch_key(filters: &AnalyticsFilters) -> String {
        format!(
            "category={}|startDate={}|endDate={}",
            filters.category.as_deref().unwrap_or(""),
            filters
                .start_date
                .map(|d| d.to_string())
                .unwrap_or_default(),
            filters.end_date.map(|d| d.to_string()).unwrap_or_default(),
        )
    }

    /// Fetch completed matches (with participants) for the aggregation
    /// filters, deduplicating identical fetches within this scope.
    pub async fn completed_matches(
        &self,
        store: &dyn DocumentStore,
        filters: &AnalyticsFilters,
    ) -> Result<Arc<Vec<MatchWithPlayers>>, StoreError> {
        let key = Self::fetch_key(filters);

        // The lock is held across the fetch on purpose: a second caller
        // for the same key waits for the first fetch instead of
        // duplicating it, and aggregation call graphs are sequential
        // within one request anyway.
        let mut fetches = self.fetches.lock().await;
        if let Some(matches) = fetches.get(&key) {
            return Ok(matches.clone());
        }

        let page = find_with_participants(
            store,
            &filters.to_match_filters(MAX_AGGREGATION_MATCHES),
        )
        .await?;
        let matches = Arc::new(page.matches);
        fetches.insert(key, matches.clone());
        Ok(matches)
    }
}
