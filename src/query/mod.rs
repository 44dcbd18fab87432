//! Match query planner with missing-index fallback.
//!
//! Builds filtered, sorted, limited queries against the match collection.
//! Composite indexes backing a filter+sort combination may not be
//! provisioned yet; when the store signals that, the planner re-issues a
//! broader unindexed query and performs the range filter, sort and
//! truncation in memory. Both paths order records through the shared
//! strategy in [`order`], so the fallback is sort-order-equivalent to the
//! indexed path. It exists purely to cover index-provisioning lag.

pub mod loader;
pub mod order;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{DocId, Match, MatchFilters, MatchState};
use crate::store::{DocumentStore, MatchQuery, RangeFilter, StoreError};

use order::{compare_matches, natural_order};

/// One page of match query results.
#[derive(Debug, Clone, Serialize)]
pub struct MatchPage {
    pub matches: Vec<Match>,
    /// Id of the last returned record, present when more pages may exist.
    pub next_cursor: Option<DocId>,
    /// True iff the returned page is exactly `limit` long.
    pub has_more: bool,
}

impl MatchPage {
    fn empty() -> Self {
        Self {
            matches: Vec::new(),
            next_cursor: None,
            has_more: false,
        }
    }
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).expect("midnight exists"))
}

/// Inclusive calendar dates widened to a half-open timestamp range.
fn range_bounds(filters: &MatchFilters) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let start = filters.start_date.map(day_start);
    let end = filters
        .end_date
        .map(|date| day_start(date.succ_opt().unwrap_or(date)));
    (start, end)
}

/// Timestamp field the date range applies to for a state filter.
fn range_field(state: MatchState) -> &'static str {
    match state {
        MatchState::Scheduled => "scheduledAt",
        MatchState::Completed => "playedAt",
    }
}

/// Build the fully indexed query for a filter set.
fn build_indexed_query(filters: &MatchFilters) -> MatchQuery {
    let mut query = MatchQuery::new().where_eq("isDeleted", false);

    match filters.state {
        Some(state) => {
            query = query.where_eq("state", state.as_str());

            let (start, end) = range_bounds(filters);
            if start.is_some() || end.is_some() {
                query.range = Some(RangeFilter {
                    field: range_field(state),
                    start,
                    end,
                });
            }

            // Category only applies to completed matches.
            if state == MatchState::Completed {
                if let Some(ref category) = filters.category {
                    query = query.where_eq("category", category.clone());
                }
            }

            if let Some(number) = filters.match_number {
                query = query.where_eq("matchNumber", number);
            } else {
                query = query.order(natural_order(Some(state)));
            }
        }
        None => {
            // Without a state filter the range and category filters apply
            // to different fields per state, so they are silently ignored
            // (documented limitation, not an error).
            if let Some(number) = filters.match_number {
                query = query.where_eq("matchNumber", number);
            } else {
                query = query.order(natural_order(None));
            }
        }
    }

    query.start_after = filters.cursor.clone();
    query.limit = filters.page_limit();
    query
}

/// Build the broader fallback query: same equality filters, no range, no
/// sort, twice the page size to compensate for the missing ordering.
fn build_fallback_query(filters: &MatchFilters) -> MatchQuery {
    let mut query = MatchQuery::new().where_eq("isDeleted", false);
    if let Some(state) = filters.state {
        query = query.where_eq("state", state.as_str());
        if state == MatchState::Completed {
            if let Some(ref category) = filters.category {
                query = query.where_eq("category", category.clone());
            }
        }
    }
    if let Some(number) = filters.match_number {
        query = query.where_eq("matchNumber", number);
    }
    query.limit = filters.page_limit() * 2;
    query
}

/// Timestamp the date range checks against, per the filtered state.
fn range_timestamp(state: MatchState, record: &Match) -> Option<DateTime<Utc>> {
    match state {
        MatchState::Scheduled => record.scheduled_at,
        MatchState::Completed => record.played_at,
    }
}

/// Execute the fallback path: load candidates, filter, sort and paginate
/// in memory.
async fn find_fallback(
    store: &dyn DocumentStore,
    filters: &MatchFilters,
) -> Result<MatchPage, StoreError> {
    let docs = store.query_matches(&build_fallback_query(filters)).await?;

    let mut matches: Vec<Match> = docs
        .into_iter()
        .map(|doc| Match::from_document(doc.id, &doc.fields))
        .filter(|m| !m.is_deleted)
        .collect();

    // The fallback query drops the range filter, so it is re-applied
    // here against the state's own timestamp field.
    if let Some(state) = filters.state {
        let (start, end) = range_bounds(filters);
        if start.is_some() || end.is_some() {
            matches.retain(|m| match range_timestamp(state, m) {
                None => false,
                Some(at) => {
                    start.map(|s| at >= s).unwrap_or(true) && end.map(|e| at < e).unwrap_or(true)
                }
            });
        }
    }

    let ordering = natural_order(filters.state);
    matches.sort_by(|a, b| compare_matches(&ordering, a, b));

    if let Some(ref cursor) = filters.cursor {
        if let Some(pos) = matches.iter().position(|m| &m.id == cursor) {
            matches.drain(..=pos);
        }
    }

    matches.truncate(filters.page_limit());
    Ok(paginate(matches, filters.page_limit()))
}

fn paginate(matches: Vec<Match>, limit: usize) -> MatchPage {
    let has_more = matches.len() == limit && limit > 0;
    let next_cursor = if has_more {
        matches.last().map(|m| m.id.clone())
    } else {
        None
    };
    MatchPage {
        matches,
        next_cursor,
        has_more,
    }
}

/// Find matches for a filter set.
///
/// Soft-deleted matches are always excluded. A missing composite index
/// triggers the in-memory fallback; any other store error propagates to
/// the caller unmodified.
pub async fn find(
    store: &dyn DocumentStore,
    filters: &MatchFilters,
) -> Result<MatchPage, StoreError> {
    debug!(?filters, "querying matches");

    let docs = match store.query_matches(&build_indexed_query(filters)).await {
        Ok(docs) => docs,
        Err(StoreError::MissingIndex(index)) => {
            // Expected while indexes are still being provisioned.
            warn!(%index, "composite index unavailable, using fallback query");
            return find_fallback(store, filters).await;
        }
        Err(err) => return Err(err),
    };

    let matches: Vec<Match> = docs
        .into_iter()
        .map(|doc| Match::from_document(doc.id, &doc.fields))
        // Double-check in case the store did not filter it.
        .filter(|m| !m.is_deleted)
        .collect();

    if matches.is_empty() {
        return Ok(MatchPage::empty());
    }
    Ok(paginate(matches, filters.page_limit()))
}
