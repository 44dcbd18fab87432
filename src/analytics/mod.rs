//! Aggregation pipelines.
//!
//! Read-only algorithms over completed matches and their participants:
//! activity trends, win/loss tallies, class statistics, duration
//! distributions, participant counts, aggregate totals, leaderboards and
//! rating-history reconstruction.
//!
//! All pipelines share one failure contract: internal errors are logged
//! with the operation name and filters, and the zeroed/empty result of
//! the correct shape is returned. Callers never receive an error from
//! an aggregation. Each public function is wrapped in the result cache
//! and takes a [`RequestScope`] so fetches within one logical request are
//! issued once.

mod classes;
mod leaderboards;
mod rating;
mod series;
mod totals;
mod winrate;

pub use classes::*;
pub use leaderboards::*;
pub use rating::*;
pub use series::*;
pub use totals::*;
pub use winrate::*;

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::cache::ResultCache;
use crate::models::{AnalyticsFilters, MatchWithPlayers, TeamFormat};
use crate::store::DocumentStore;

/// Shared handles the aggregation pipelines operate on.
#[derive(Clone)]
pub struct AnalyticsContext {
    pub store: Arc<dyn DocumentStore>,
    pub cache: Arc<ResultCache>,
}

impl AnalyticsContext {
    pub fn new(store: Arc<dyn DocumentStore>, cache: Arc<ResultCache>) -> Self {
        Self { store, cache }
    }
}

/// The requested window, defaulting to the trailing year.
fn requested_window(filters: &AnalyticsFilters) -> (NaiveDate, NaiveDate) {
    let today = Utc::now().date_naive();
    let start = filters
        .start_date
        .unwrap_or_else(|| today - chrono::Days::new(365));
    let end = filters.end_date.unwrap_or(today);
    (start, end)
}

/// Whether a match satisfies an optional `"{N}v{M}"` team-format filter.
/// The format of a match is derived post-hoc from its winner/loser
/// participant counts; an unparseable filter matches nothing.
fn matches_team_format(record: &MatchWithPlayers, filter: Option<&str>) -> bool {
    match filter {
        None => true,
        Some(raw) => match TeamFormat::parse(raw) {
            None => false,
            Some(wanted) => TeamFormat::of_participants(&record.players) == wanted,
        },
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use crate::models::{DocId, Match, Participant, ResultFlag};
    use crate::store::{DocumentStore, MemoryStore};
    use chrono::TimeZone;

    pub(crate) fn test_context() -> (Arc<MemoryStore>, AnalyticsContext) {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(ResultCache::with_defaults());
        let ctx = AnalyticsContext::new(store.clone(), cache);
        (store, ctx)
    }

    pub(crate) fn player(name: &str, seat: i64, flag: ResultFlag) -> Participant {
        Participant::new(DocId::from("placeholder"), name, seat, flag)
    }

    /// Insert a completed match played at noon on the given day.
    pub(crate) async fn seed_match(
        store: &MemoryStore,
        number: i64,
        month: u32,
        day: u32,
        category: &str,
        players: Vec<Participant>,
    ) -> DocId {
        let record = Match::completed(
            number,
            Utc.with_ymd_and_hms(2024, month, day, 12, 0, 0).unwrap(),
        )
        .with_category(category);
        store
            .insert_match(
                record.to_document(),
                players.iter().map(|p| p.to_document()).collect(),
            )
            .await
            .unwrap()
    }
}
