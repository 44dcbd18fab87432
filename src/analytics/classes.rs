//! Class (category label) statistics.
//!
//! Participants are grouped by normalized class label (lower-cased,
//! trimmed, non-empty) and drawers are excluded throughout: only
//! decided games count towards class records.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{error, info};

use crate::cache::RequestScope;
use crate::models::{AnalyticsFilters, Participant, ResultFlag};
use crate::store::StoreError;

use super::{matches_team_format, AnalyticsContext};

/// One player's record within a class leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassPlayerEntry {
    pub player_name: String,
    pub wins: u32,
    pub losses: u32,
    pub win_rate: f64,
    /// Net rating delta accumulated on this class
    pub rating_delta: f64,
}

/// Aggregate statistics for one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassStats {
    /// Normalized class label
    pub id: String,
    /// Category filter these stats were computed under
    pub category: Option<String>,
    pub total_games: u32,
    pub total_wins: u32,
    pub total_losses: u32,
    /// Win rate percentage; 0 when the class has no decided games
    pub win_rate: f64,
    /// Top players by win rate, at most 10
    pub top_players: Vec<ClassPlayerEntry>,
}

/// Flat selection count for one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCount {
    pub class: String,
    pub count: u32,
}

/// Flat win rate for one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassWinRate {
    pub class: String,
    pub win_rate: f64,
}

/// Normalized class label of a participant, if usable: drawers and
/// participants without a class are skipped.
fn normalized_class(player: &Participant) -> Option<String> {
    if player.result_flag == ResultFlag::Drawer {
        return None;
    }
    let class = player.class.as_deref()?.trim().to_lowercase();
    if class.is_empty() {
        None
    } else {
        Some(class)
    }
}

fn percentage(wins: u32, losses: u32) -> f64 {
    let decided = wins + losses;
    if decided > 0 {
        wins as f64 / decided as f64 * 100.0
    } else {
        0.0
    }
}

/// Per-class statistics with a nested top-10 player leaderboard, sorted
/// by total games descending.
pub async fn class_stats(
    ctx: &AnalyticsContext,
    scope: &RequestScope,
    filters: &AnalyticsFilters,
) -> Vec<ClassStats> {
    ctx.cache
        .get_or_compute("class_stats", filters, || async {
            match compute_class_stats(ctx, scope, filters).await {
                Ok(stats) => stats,
                Err(err) => {
                    error!(operation = "class_stats", ?filters, %err, "aggregation failed");
                    Vec::new()
                }
            }
        })
        .await
}

#[derive(Default)]
struct ClassAccumulator {
    total_games: u32,
    total_wins: u32,
    total_losses: u32,
    players: HashMap<String, PlayerAccumulator>,
}

#[derive(Default)]
struct PlayerAccumulator {
    wins: u32,
    losses: u32,
    rating_delta: f64,
}

async fn compute_class_stats(
    ctx: &AnalyticsContext,
    scope: &RequestScope,
    filters: &AnalyticsFilters,
) -> Result<Vec<ClassStats>, StoreError> {
    info!(?filters, "computing class stats");
    let matches = scope.completed_matches(ctx.store.as_ref(), filters).await?;

    let mut classes: HashMap<String, ClassAccumulator> = HashMap::new();
    for m in matches.iter() {
        for player in &m.players {
            let Some(class) = normalized_class(player) else {
                continue;
            };
            let acc = classes.entry(class).or_default();
            acc.total_games += 1;

            let player_acc = acc.players.entry(player.player_name.clone()).or_default();
            match player.result_flag {
                ResultFlag::Winner => {
                    acc.total_wins += 1;
                    player_acc.wins += 1;
                }
                ResultFlag::Loser => {
                    acc.total_losses += 1;
                    player_acc.losses += 1;
                }
                ResultFlag::Drawer => unreachable!("drawers are filtered out"),
            }
            if let Some(delta) = player.rating_delta {
                player_acc.rating_delta += delta;
            }
        }
    }

    let mut stats: Vec<ClassStats> = classes
        .into_iter()
        .map(|(id, acc)| {
            let mut top_players: Vec<ClassPlayerEntry> = acc
                .players
                .into_iter()
                .filter(|(_, p)| p.wins + p.losses > 0)
                .map(|(player_name, p)| ClassPlayerEntry {
                    win_rate: percentage(p.wins, p.losses),
                    player_name,
                    wins: p.wins,
                    losses: p.losses,
                    rating_delta: p.rating_delta,
                })
                .collect();

            top_players.sort_by(|a, b| {
                b.win_rate
                    .partial_cmp(&a.win_rate)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| (b.wins + b.losses).cmp(&(a.wins + a.losses)))
                    .then_with(|| {
                        b.rating_delta
                            .partial_cmp(&a.rating_delta)
                            .unwrap_or(Ordering::Equal)
                    })
                    .then_with(|| a.player_name.cmp(&b.player_name))
            });
            top_players.truncate(10);

            ClassStats {
                win_rate: percentage(acc.total_wins, acc.total_losses),
                id,
                category: filters.category.clone(),
                total_games: acc.total_games,
                total_wins: acc.total_wins,
                total_losses: acc.total_losses,
                top_players,
            }
        })
        .collect();

    stats.sort_by(|a, b| {
        b.total_games
            .cmp(&a.total_games)
            .then_with(|| a.id.cmp(&b.id))
    });
    Ok(stats)
}

/// Flat class selection counts, sorted by count descending.
pub async fn class_selection(
    ctx: &AnalyticsContext,
    scope: &RequestScope,
    filters: &AnalyticsFilters,
) -> Vec<ClassCount> {
    ctx.cache
        .get_or_compute("class_selection", filters, || async {
            match compute_class_selection(ctx, scope, filters).await {
                Ok(counts) => counts,
                Err(err) => {
                    error!(operation = "class_selection", ?filters, %err, "aggregation failed");
                    Vec::new()
                }
            }
        })
        .await
}

async fn compute_class_selection(
    ctx: &AnalyticsContext,
    scope: &RequestScope,
    filters: &AnalyticsFilters,
) -> Result<Vec<ClassCount>, StoreError> {
    info!(?filters, "computing class selection data");
    let matches = scope.completed_matches(ctx.store.as_ref(), filters).await?;

    let mut counts: HashMap<String, u32> = HashMap::new();
    for m in matches
        .iter()
        .filter(|m| matches_team_format(m, filters.team_format.as_deref()))
    {
        for player in &m.players {
            if let Some(class) = normalized_class(player) {
                *counts.entry(class).or_default() += 1;
            }
        }
    }

    let mut selection: Vec<ClassCount> = counts
        .into_iter()
        .map(|(class, count)| ClassCount { class, count })
        .collect();
    selection.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.class.cmp(&b.class)));
    Ok(selection)
}

/// Flat class win rates, sorted by rate descending.
pub async fn class_win_rates(
    ctx: &AnalyticsContext,
    scope: &RequestScope,
    filters: &AnalyticsFilters,
) -> Vec<ClassWinRate> {
    ctx.cache
        .get_or_compute("class_win_rate", filters, || async {
            match compute_class_win_rates(ctx, scope, filters).await {
                Ok(rates) => rates,
                Err(err) => {
                    error!(operation = "class_win_rates", ?filters, %err, "aggregation failed");
                    Vec::new()
                }
            }
        })
        .await
}

async fn compute_class_win_rates(
    ctx: &AnalyticsContext,
    scope: &RequestScope,
    filters: &AnalyticsFilters,
) -> Result<Vec<ClassWinRate>, StoreError> {
    info!(?filters, "computing class win rate data");
    let matches = scope.completed_matches(ctx.store.as_ref(), filters).await?;

    let mut records: HashMap<String, (u32, u32)> = HashMap::new();
    for m in matches
        .iter()
        .filter(|m| matches_team_format(m, filters.team_format.as_deref()))
    {
        for player in &m.players {
            let Some(class) = normalized_class(player) else {
                continue;
            };
            let entry = records.entry(class).or_default();
            match player.result_flag {
                ResultFlag::Winner => entry.0 += 1,
                ResultFlag::Loser => entry.1 += 1,
                ResultFlag::Drawer => unreachable!("drawers are filtered out"),
            }
        }
    }

    let mut rates: Vec<ClassWinRate> = records
        .into_iter()
        .map(|(class, (wins, losses))| ClassWinRate {
            class,
            win_rate: percentage(wins, losses),
        })
        .collect();
    rates.sort_by(|a, b| {
        b.win_rate
            .partial_cmp(&a.win_rate)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.class.cmp(&b.class))
    });
    Ok(rates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::testutil::{player, seed_match, test_context};
    use crate::models::ResultFlag::*;

    #[tokio::test]
    async fn test_single_class_one_win_one_loss() {
        let (store, ctx) = test_context();
        seed_match(
            &store,
            1,
            1,
            5,
            "1v1",
            vec![
                player("Alice", 0, Winner).with_class("Warrior"),
                player("Bob", 1, Loser).with_class("Warrior"),
            ],
        )
        .await;

        let stats = class_stats(&ctx, &RequestScope::new(), &AnalyticsFilters::default()).await;
        assert_eq!(stats.len(), 1);
        let warrior = &stats[0];
        assert_eq!(warrior.id, "warrior");
        assert_eq!(warrior.total_games, 2);
        assert_eq!(warrior.total_wins, 1);
        assert_eq!(warrior.total_losses, 1);
        assert_eq!(warrior.win_rate, 50.0);
    }

    #[tokio::test]
    async fn test_normalization_and_drawer_exclusion() {
        let (store, ctx) = test_context();
        seed_match(
            &store,
            1,
            1,
            5,
            "1v1",
            vec![
                player("Alice", 0, Winner).with_class("  Hunter "),
                player("Bob", 1, Loser).with_class("HUNTER"),
                player("Cara", 2, Drawer).with_class("Hunter"),
                player("Dan", 3, Winner).with_class("   "),
                player("Eve", 4, Loser),
            ],
        )
        .await;

        let stats = class_stats(&ctx, &RequestScope::new(), &AnalyticsFilters::default()).await;
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].id, "hunter");
        // The drawer, the blank class and the classless player are skipped.
        assert_eq!(stats[0].total_games, 2);
    }

    #[tokio::test]
    async fn test_leaderboard_sorted_and_truncated() {
        let (store, ctx) = test_context();
        // 12 players on one class: p0..p11, pN wins N games out of 12.
        for round in 0..12i64 {
            for n in 0..12i64 {
                let flag = if n <= round { Winner } else { Loser };
                seed_match(
                    &store,
                    round * 12 + n + 1,
                    1,
                    (round + 1) as u32,
                    "1v1",
                    vec![player(&format!("p{:02}", n), 0, flag).with_class("Scout")],
                )
                .await;
            }
        }

        let stats = class_stats(&ctx, &RequestScope::new(), &AnalyticsFilters::default()).await;
        let top = &stats[0].top_players;
        assert_eq!(top.len(), 10);
        // p00 has the most wins (11 of 12), p11 the fewest.
        assert_eq!(top[0].player_name, "p00");
        for pair in top.windows(2) {
            assert!(pair[0].win_rate >= pair[1].win_rate);
        }
    }

    #[tokio::test]
    async fn test_leaderboard_net_rating_delta() {
        let (store, ctx) = test_context();
        seed_match(
            &store,
            1,
            1,
            5,
            "1v1",
            vec![
                player("Alice", 0, Winner)
                    .with_class("Mage")
                    .with_rating_delta(16.0),
                player("Bob", 1, Loser)
                    .with_class("Mage")
                    .with_rating_delta(-16.0),
            ],
        )
        .await;
        seed_match(
            &store,
            2,
            1,
            6,
            "1v1",
            vec![
                player("Alice", 0, Winner)
                    .with_class("Mage")
                    .with_rating_delta(12.0),
                player("Bob", 1, Loser)
                    .with_class("Mage")
                    .with_rating_delta(-12.0),
            ],
        )
        .await;

        let stats = class_stats(&ctx, &RequestScope::new(), &AnalyticsFilters::default()).await;
        let top = &stats[0].top_players;
        assert_eq!(top[0].player_name, "Alice");
        assert_eq!(top[0].rating_delta, 28.0);
        assert_eq!(top[1].rating_delta, -28.0);
    }

    #[tokio::test]
    async fn test_classes_sorted_by_total_games() {
        let (store, ctx) = test_context();
        for n in 0..3i64 {
            seed_match(
                &store,
                n + 1,
                1,
                (n + 1) as u32,
                "1v1",
                vec![
                    player("a", 0, Winner).with_class("Common"),
                    player("b", 1, Loser).with_class("Common"),
                ],
            )
            .await;
        }
        seed_match(
            &store,
            10,
            1,
            9,
            "1v1",
            vec![
                player("a", 0, Winner).with_class("Rare"),
                player("b", 1, Loser).with_class("Rare"),
            ],
        )
        .await;

        let stats = class_stats(&ctx, &RequestScope::new(), &AnalyticsFilters::default()).await;
        assert_eq!(stats[0].id, "common");
        assert_eq!(stats[1].id, "rare");
    }

    #[tokio::test]
    async fn test_class_selection_counts() {
        let (store, ctx) = test_context();
        seed_match(
            &store,
            1,
            1,
            5,
            "1v1",
            vec![
                player("a", 0, Winner).with_class("Hunter"),
                player("b", 1, Loser).with_class("Mage"),
            ],
        )
        .await;
        seed_match(
            &store,
            2,
            1,
            6,
            "1v1",
            vec![
                player("c", 0, Winner).with_class("hunter"),
                player("d", 1, Loser).with_class("Scout"),
            ],
        )
        .await;

        let selection =
            class_selection(&ctx, &RequestScope::new(), &AnalyticsFilters::default()).await;
        assert_eq!(selection[0].class, "hunter");
        assert_eq!(selection[0].count, 2);
        assert_eq!(selection.len(), 3);
    }

    #[tokio::test]
    async fn test_class_win_rates_sorted_descending() {
        let (store, ctx) = test_context();
        seed_match(
            &store,
            1,
            1,
            5,
            "1v1",
            vec![
                player("a", 0, Winner).with_class("Strong"),
                player("b", 1, Loser).with_class("Weak"),
            ],
        )
        .await;
        seed_match(
            &store,
            2,
            1,
            6,
            "1v1",
            vec![
                player("c", 0, Winner).with_class("Strong"),
                player("d", 1, Loser).with_class("Weak"),
            ],
        )
        .await;
        seed_match(
            &store,
            3,
            1,
            7,
            "1v1",
            vec![
                player("e", 0, Winner).with_class("Weak"),
                player("f", 1, Loser).with_class("Strong"),
            ],
        )
        .await;

        let rates =
            class_win_rates(&ctx, &RequestScope::new(), &AnalyticsFilters::default()).await;
        assert_eq!(rates[0].class, "strong");
        assert!((rates[0].win_rate - 66.666).abs() < 0.01);
        assert_eq!(rates[1].class, "weak");
        assert!((rates[1].win_rate - 33.333).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_empty_store_returns_empty() {
        let (_store, ctx) = test_context();
        let filters = AnalyticsFilters::default();
        assert!(class_stats(&ctx, &RequestScope::new(), &filters).await.is_empty());
        assert!(class_selection(&ctx, &RequestScope::new(), &filters).await.is_empty());
        assert!(class_win_rates(&ctx, &RequestScope::new(), &filters).await.is_empty());
    }
}
