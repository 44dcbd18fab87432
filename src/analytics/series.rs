//! Time-series aggregations: activity, match length and participant
//! counts per calendar bucket.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{error, info};

use crate::cache::RequestScope;
use crate::models::AnalyticsFilters;
use crate::store::StoreError;

use super::{matches_team_format, requested_window, AnalyticsContext};

/// Matches played on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityPoint {
    pub date: NaiveDate,
    pub count: u32,
}

/// Average match duration for one calendar day, in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchLengthPoint {
    pub date: NaiveDate,
    pub average_minutes: f64,
}

/// Distinct participants seen in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantActivityPoint {
    pub month: NaiveDate,
    pub players: u32,
}

/// Every day in the inclusive range.
fn days_in_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut day = start;
    while day <= end {
        days.push(day);
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    days
}

/// The first day of every month in the inclusive range.
fn months_in_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut months = Vec::new();
    let mut month = start.with_day(1).expect("day 1 exists");
    let end_month = end.with_day(1).expect("day 1 exists");
    while month <= end_month {
        months.push(month);
        match month.checked_add_months(Months::new(1)) {
            Some(next) => month = next,
            None => break,
        }
    }
    months
}

/// Matches played per calendar day.
///
/// The series is dense: every day of the range is emitted, days without
/// matches with count 0. Without an explicit range the series spans 7
/// days before the earliest match to 7 days after the latest, or the
/// trailing year when there are no matches at all.
pub async fn activity_by_day(
    ctx: &AnalyticsContext,
    scope: &RequestScope,
    filters: &AnalyticsFilters,
) -> Vec<ActivityPoint> {
    ctx.cache
        .get_or_compute("activity", filters, || async {
            match compute_activity(ctx, scope, filters).await {
                Ok(points) => points,
                Err(err) => {
                    error!(operation = "activity_by_day", ?filters, %err, "aggregation failed");
                    Vec::new()
                }
            }
        })
        .await
}

async fn compute_activity(
    ctx: &AnalyticsContext,
    scope: &RequestScope,
    filters: &AnalyticsFilters,
) -> Result<Vec<ActivityPoint>, StoreError> {
    info!(?filters, "computing activity data");
    let matches = scope.completed_matches(ctx.store.as_ref(), filters).await?;

    let played_dates: Vec<NaiveDate> = matches
        .iter()
        .filter_map(|m| m.record.played_at.map(|at| at.date_naive()))
        .collect();

    let (start, end) = match (filters.start_date, filters.end_date) {
        (Some(start), Some(end)) => (start, end),
        _ if !played_dates.is_empty() => {
            let min = *played_dates.iter().min().expect("nonempty");
            let max = *played_dates.iter().max().expect("nonempty");
            // Widen by a week on each side for context around the data.
            (min - Days::new(7), max + Days::new(7))
        }
        _ => requested_window(filters),
    };

    let mut counts: HashMap<NaiveDate, u32> = HashMap::new();
    for date in played_dates {
        *counts.entry(date).or_default() += 1;
    }

    Ok(days_in_range(start, end)
        .into_iter()
        .map(|date| ActivityPoint {
            date,
            count: counts.get(&date).copied().unwrap_or(0),
        })
        .collect())
}

/// Average match duration (minutes) per day across the requested window.
/// Days with no matches report average 0. An optional team-format filter
/// restricts the input set before grouping.
pub async fn match_length_by_day(
    ctx: &AnalyticsContext,
    scope: &RequestScope,
    filters: &AnalyticsFilters,
) -> Vec<MatchLengthPoint> {
    ctx.cache
        .get_or_compute("match_length", filters, || async {
            match compute_match_length(ctx, scope, filters).await {
                Ok(points) => points,
                Err(err) => {
                    error!(operation = "match_length_by_day", ?filters, %err, "aggregation failed");
                    Vec::new()
                }
            }
        })
        .await
}

async fn compute_match_length(
    ctx: &AnalyticsContext,
    scope: &RequestScope,
    filters: &AnalyticsFilters,
) -> Result<Vec<MatchLengthPoint>, StoreError> {
    info!(?filters, "computing match length data");
    let matches = scope.completed_matches(ctx.store.as_ref(), filters).await?;

    let (start, end) = requested_window(filters);

    let mut by_date: HashMap<NaiveDate, (f64, u32)> = HashMap::new();
    for m in matches
        .iter()
        .filter(|m| matches_team_format(m, filters.team_format.as_deref()))
    {
        let Some(played_at) = m.record.played_at else {
            continue;
        };
        let minutes = m.record.duration_seconds as f64 / 60.0;
        let entry = by_date.entry(played_at.date_naive()).or_default();
        entry.0 += minutes;
        entry.1 += 1;
    }

    Ok(days_in_range(start, end)
        .into_iter()
        .map(|date| {
            let average_minutes = match by_date.get(&date) {
                Some((total, count)) if *count > 0 => total / *count as f64,
                _ => 0.0,
            };
            MatchLengthPoint {
                date,
                average_minutes,
            }
        })
        .collect())
}

/// Distinct (case-insensitive) participant names per calendar month
/// across the requested window.
pub async fn participant_activity_by_month(
    ctx: &AnalyticsContext,
    scope: &RequestScope,
    filters: &AnalyticsFilters,
) -> Vec<ParticipantActivityPoint> {
    ctx.cache
        .get_or_compute("participant_activity", filters, || async {
            match compute_participant_activity(ctx, scope, filters).await {
                Ok(points) => points,
                Err(err) => {
                    error!(
                        operation = "participant_activity_by_month",
                        ?filters,
                        %err,
                        "aggregation failed"
                    );
                    Vec::new()
                }
            }
        })
        .await
}

async fn compute_participant_activity(
    ctx: &AnalyticsContext,
    scope: &RequestScope,
    filters: &AnalyticsFilters,
) -> Result<Vec<ParticipantActivityPoint>, StoreError> {
    info!(?filters, "computing participant activity data");
    let matches = scope.completed_matches(ctx.store.as_ref(), filters).await?;

    let (start, end) = requested_window(filters);

    let mut by_month: HashMap<NaiveDate, HashSet<String>> = HashMap::new();
    for m in matches
        .iter()
        .filter(|m| matches_team_format(m, filters.team_format.as_deref()))
    {
        let Some(played_at) = m.record.played_at else {
            continue;
        };
        let month = played_at.date_naive().with_day(1).expect("day 1 exists");
        let names = by_month.entry(month).or_default();
        for player in &m.players {
            names.insert(player.player_name.to_lowercase());
        }
    }

    Ok(months_in_range(start, end)
        .into_iter()
        .map(|month| ParticipantActivityPoint {
            month,
            players: by_month.get(&month).map(|s| s.len() as u32).unwrap_or(0),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::testutil::{player, seed_match, test_context};
    use crate::models::ResultFlag;
    use crate::store::DocumentStore;
    use pretty_assertions::assert_eq;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    #[test]
    fn test_days_in_range_inclusive() {
        let days = days_in_range(date(1, 30), date(2, 2));
        assert_eq!(
            days,
            vec![date(1, 30), date(1, 31), date(2, 1), date(2, 2)]
        );
    }

    #[test]
    fn test_months_in_range() {
        let months = months_in_range(date(1, 15), date(3, 2));
        assert_eq!(months, vec![date(1, 1), date(2, 1), date(3, 1)]);
    }

    #[tokio::test]
    async fn test_activity_dense_series() {
        let (store, ctx) = test_context();
        seed_match(&store, 1, 1, 1, "1v1", vec![]).await;
        seed_match(&store, 2, 1, 1, "1v1", vec![]).await;
        seed_match(&store, 3, 1, 2, "1v1", vec![]).await;

        let filters = AnalyticsFilters::default().with_range(date(1, 1), date(1, 2));
        let points = activity_by_day(&ctx, &RequestScope::new(), &filters).await;

        assert_eq!(
            points,
            vec![
                ActivityPoint {
                    date: date(1, 1),
                    count: 2
                },
                ActivityPoint {
                    date: date(1, 2),
                    count: 1
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_activity_days_without_matches_are_zero() {
        let (store, ctx) = test_context();
        seed_match(&store, 1, 1, 1, "1v1", vec![]).await;
        seed_match(&store, 2, 1, 3, "1v1", vec![]).await;

        let filters = AnalyticsFilters::default().with_range(date(1, 1), date(1, 3));
        let points = activity_by_day(&ctx, &RequestScope::new(), &filters).await;

        assert_eq!(points.len(), 3);
        assert_eq!(points[1].date, date(1, 2));
        assert_eq!(points[1].count, 0);
    }

    #[tokio::test]
    async fn test_activity_default_range_widens_a_week() {
        let (store, ctx) = test_context();
        seed_match(&store, 1, 2, 10, "1v1", vec![]).await;

        let points = activity_by_day(&ctx, &RequestScope::new(), &AnalyticsFilters::default()).await;
        assert_eq!(points.first().unwrap().date, date(2, 3));
        assert_eq!(points.last().unwrap().date, date(2, 17));
        assert_eq!(points.iter().map(|p| p.count).sum::<u32>(), 1);
    }

    #[tokio::test]
    async fn test_match_length_average_per_day() {
        let (store, ctx) = test_context();
        let a = seed_match(&store, 1, 1, 1, "1v1", vec![]).await;
        let b = seed_match(&store, 2, 1, 1, "1v1", vec![]).await;
        // 30 and 60 minutes on the same day
        use crate::models::Document;
        use serde_json::Value;
        for (id, seconds) in [(a, 1800i64), (b, 3600)] {
            let mut fields = Document::new();
            fields.insert("durationSeconds".into(), Value::from(seconds));
            store.update_match(&id, fields).await.unwrap();
        }

        let filters = AnalyticsFilters::default().with_range(date(1, 1), date(1, 2));
        let points = match_length_by_day(&ctx, &RequestScope::new(), &filters).await;

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].average_minutes, 45.0);
        assert_eq!(points[1].average_minutes, 0.0);
    }

    #[tokio::test]
    async fn test_match_length_team_format_filter() {
        let (store, ctx) = test_context();
        use ResultFlag::*;
        let id = seed_match(
            &store,
            1,
            1,
            1,
            "2v2",
            vec![
                player("a", 0, Winner),
                player("b", 1, Winner),
                player("c", 2, Loser),
                player("d", 3, Loser),
            ],
        )
        .await;
        use crate::models::Document;
        use serde_json::Value;
        let mut fields = Document::new();
        fields.insert("durationSeconds".into(), Value::from(600));
        store.update_match(&id, fields).await.unwrap();

        let base = AnalyticsFilters::default().with_range(date(1, 1), date(1, 1));
        let matching = AnalyticsFilters {
            team_format: Some("2v2".into()),
            ..base.clone()
        };
        let other = AnalyticsFilters {
            team_format: Some("1v1".into()),
            ..base
        };

        let points = match_length_by_day(&ctx, &RequestScope::new(), &matching).await;
        assert_eq!(points[0].average_minutes, 10.0);

        let points = match_length_by_day(&ctx, &RequestScope::new(), &other).await;
        assert_eq!(points[0].average_minutes, 0.0);
    }

    #[tokio::test]
    async fn test_participant_activity_distinct_case_insensitive() {
        let (store, ctx) = test_context();
        use ResultFlag::*;
        seed_match(
            &store,
            1,
            1,
            5,
            "1v1",
            vec![player("Alice", 0, Winner), player("Bob", 1, Loser)],
        )
        .await;
        seed_match(
            &store,
            2,
            1,
            20,
            "1v1",
            vec![player("ALICE", 0, Winner), player("Cara", 1, Loser)],
        )
        .await;
        seed_match(
            &store,
            3,
            2,
            2,
            "1v1",
            vec![player("Alice", 0, Winner), player("Dan", 1, Loser)],
        )
        .await;

        let filters = AnalyticsFilters::default().with_range(date(1, 1), date(2, 28));
        let points = participant_activity_by_month(&ctx, &RequestScope::new(), &filters).await;

        assert_eq!(points.len(), 2);
        // January: alice, bob, cara (ALICE dedupes with Alice)
        assert_eq!(points[0].players, 3);
        assert_eq!(points[1].players, 2);
    }

    #[tokio::test]
    async fn test_empty_store_series_are_zeroed() {
        let (_store, ctx) = test_context();
        let filters = AnalyticsFilters::default().with_range(date(1, 1), date(1, 3));

        let activity = activity_by_day(&ctx, &RequestScope::new(), &filters).await;
        assert_eq!(activity.len(), 3);
        assert!(activity.iter().all(|p| p.count == 0));

        let lengths = match_length_by_day(&ctx, &RequestScope::new(), &filters).await;
        assert!(lengths.iter().all(|p| p.average_minutes == 0.0));

        let months = participant_activity_by_month(&ctx, &RequestScope::new(), &filters).await;
        assert_eq!(months.len(), 1);
        assert_eq!(months[0].players, 0);
    }
}
