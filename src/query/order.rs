//! Ordering rules shared by the indexed and fallback query paths.
//!
//! The store-side `ORDER BY` clause and the fallback's in-memory sort
//! must agree exactly, so both are derived from the same
//! [`natural_order`] strategy. Keeping one source of truth is what makes
//! the two paths sort-order-equivalent.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::models::{Match, MatchState};
use crate::store::{OrderBy, SortDirection};

/// The natural ordering for a state filter:
/// - scheduled: `scheduledAt` ascending (soonest first)
/// - completed: `playedAt` descending (newest first)
/// - no state filter: creation order descending
pub fn natural_order(state: Option<MatchState>) -> OrderBy {
    match state {
        Some(MatchState::Scheduled) => OrderBy::asc("scheduledAt"),
        Some(MatchState::Completed) => OrderBy::desc("playedAt"),
        None => OrderBy::desc("createdAt"),
    }
}

/// Timestamp a match sorts by for a given order field. Missing
/// timestamps sort as the epoch, matching the store's behavior.
fn sort_key(order: &OrderBy, record: &Match) -> DateTime<Utc> {
    let value = match order.field {
        "scheduledAt" => record.scheduled_at,
        "playedAt" => record.played_at,
        _ => Some(record.created_at),
    };
    value.unwrap_or(DateTime::UNIX_EPOCH)
}

/// Compare two matches under an ordering clause. Used by the fallback
/// path's in-memory sort; the store applies the same clause natively on
/// the indexed path.
pub fn compare_matches(order: &OrderBy, a: &Match, b: &Match) -> Ordering {
    let (ka, kb) = (sort_key(order, a), sort_key(order, b));
    match order.direction {
        SortDirection::Ascending => ka.cmp(&kb),
        SortDirection::Descending => kb.cmp(&ka),
    }
}
