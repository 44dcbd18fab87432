//! Win/loss/draw tally.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::cache::RequestScope;
use crate::models::{
    normalize_player_name, AnalyticsFilters, PlayerProfile, ResultFlag, DEFAULT_CATEGORY,
};
use crate::store::StoreError;

use super::AnalyticsContext;

/// Aggregate outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinLossDraw {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
}

/// Tally outcomes across the filtered matches.
///
/// With a player name, the player's stored per-category aggregate
/// counters are read directly (the category key defaults to `"default"`
/// when no category filter is given); otherwise every participant of
/// every filtered match is scanned and tallied by outcome flag.
pub async fn win_loss_draw(
    ctx: &AnalyticsContext,
    scope: &RequestScope,
    filters: &AnalyticsFilters,
) -> WinLossDraw {
    ctx.cache
        .get_or_compute("win_rate", filters, || async {
            match compute_win_loss_draw(ctx, scope, filters).await {
                Ok(tally) => tally,
                Err(err) => {
                    error!(operation = "win_loss_draw", ?filters, %err, "aggregation failed");
                    WinLossDraw::default()
                }
            }
        })
        .await
}

async fn compute_win_loss_draw(
    ctx: &AnalyticsContext,
    scope: &RequestScope,
    filters: &AnalyticsFilters,
) -> Result<WinLossDraw, StoreError> {
    info!(?filters, "computing win rate data");

    if let Some(ref player_name) = filters.player_name {
        let name = normalize_player_name(player_name);
        let Some(doc) = ctx.store.get_player_profile(&name).await? else {
            return Ok(WinLossDraw::default());
        };
        let profile = PlayerProfile::from_document(&doc);

        let category = filters.category.as_deref().unwrap_or(DEFAULT_CATEGORY);
        let Some(record) = profile.categories.get(category) else {
            return Ok(WinLossDraw::default());
        };
        return Ok(WinLossDraw {
            wins: record.wins.max(0) as u32,
            losses: record.losses.max(0) as u32,
            draws: record.draws.max(0) as u32,
        });
    }

    let matches = scope.completed_matches(ctx.store.as_ref(), filters).await?;

    let mut tally = WinLossDraw::default();
    for m in matches.iter() {
        for player in &m.players {
            match player.result_flag {
                ResultFlag::Winner => tally.wins += 1,
                ResultFlag::Loser => tally.losses += 1,
                ResultFlag::Drawer => tally.draws += 1,
            }
        }
    }
    Ok(tally)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::testutil::{player, seed_match, test_context};
    use crate::models::ResultFlag::*;
    use crate::store::DocumentStore;

    #[tokio::test]
    async fn test_scan_tally_across_matches() {
        let (store, ctx) = test_context();
        seed_match(
            &store,
            1,
            1,
            5,
            "1v1",
            vec![player("a", 0, Winner), player("b", 1, Loser)],
        )
        .await;
        seed_match(
            &store,
            2,
            1,
            6,
            "1v1",
            vec![
                player("a", 0, Drawer),
                player("b", 1, Drawer),
                player("c", 2, Winner),
            ],
        )
        .await;

        let tally =
            win_loss_draw(&ctx, &RequestScope::new(), &AnalyticsFilters::default()).await;
        assert_eq!(
            tally,
            WinLossDraw {
                wins: 2,
                losses: 1,
                draws: 2
            }
        );
    }

    #[tokio::test]
    async fn test_player_path_reads_stored_profile() {
        let (store, ctx) = test_context();
        let mut profile = PlayerProfile::new("Alice");
        {
            let record = profile.category_mut("1v1");
            record.wins = 12;
            record.losses = 8;
            record.draws = 1;
        }
        store
            .upsert_player_profile("alice", profile.to_document())
            .await
            .unwrap();

        let filters = AnalyticsFilters::default()
            .with_player("Alice")
            .with_category("1v1");
        let tally = win_loss_draw(&ctx, &RequestScope::new(), &filters).await;
        assert_eq!(
            tally,
            WinLossDraw {
                wins: 12,
                losses: 8,
                draws: 1
            }
        );
        // The profile fast path never touches the match collection.
        assert_eq!(store.match_query_count(), 0);
    }

    #[tokio::test]
    async fn test_player_without_profile_is_zeroed() {
        let (_store, ctx) = test_context();
        let filters = AnalyticsFilters::default().with_player("Ghost");
        let tally = win_loss_draw(&ctx, &RequestScope::new(), &filters).await;
        assert_eq!(tally, WinLossDraw::default());
    }

    #[tokio::test]
    async fn test_player_category_defaults() {
        let (store, ctx) = test_context();
        let mut profile = PlayerProfile::new("Bob");
        profile.category_mut(DEFAULT_CATEGORY).wins = 3;
        store
            .upsert_player_profile("bob", profile.to_document())
            .await
            .unwrap();

        // No category filter: the "default" category record is used.
        let filters = AnalyticsFilters::default().with_player("bob");
        let tally = win_loss_draw(&ctx, &RequestScope::new(), &filters).await;
        assert_eq!(tally.wins, 3);

        // A category with no record is zeroed, not an error.
        let filters = AnalyticsFilters::default()
            .with_player("bob")
            .with_category("9v9");
        let tally = win_loss_draw(&ctx, &RequestScope::new(), &filters).await;
        assert_eq!(tally, WinLossDraw::default());
    }
}
