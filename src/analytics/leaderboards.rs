//! Per-player leaderboards: top hunters and top healers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{error, info};

use crate::cache::RequestScope;
use crate::models::{AnalyticsFilters, AnimalKind, DEFAULT_LEADERBOARD_LIMIT};
use crate::store::StoreError;

use super::AnalyticsContext;

/// One entry on the hunters leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopHunterEntry {
    pub player_name: String,
    pub total_kills: i64,
    /// The animal this player kills most; "None" when they kill nothing.
    pub favorite_animal: String,
    pub matches_played: u32,
}

/// One entry on the healers leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopHealerEntry {
    pub player_name: String,
    pub total_healing: i64,
    pub self_healing: i64,
    pub ally_healing: i64,
    pub matches_played: u32,
}

/// Top animal hunters across the filtered matches, ranked by total
/// kills. Players with zero kills are dropped; at most `limit` entries
/// (default 10) are returned.
pub async fn top_hunters(
    ctx: &AnalyticsContext,
    scope: &RequestScope,
    filters: &AnalyticsFilters,
) -> Vec<TopHunterEntry> {
    ctx.cache
        .get_or_compute("top_hunters", filters, || async {
            match compute_top_hunters(ctx, scope, filters).await {
                Ok(entries) => entries,
                Err(err) => {
                    error!(operation = "top_hunters", ?filters, %err, "aggregation failed");
                    Vec::new()
                }
            }
        })
        .await
}

#[derive(Default)]
struct HunterAccumulator {
    matches_played: u32,
    kills: [i64; 6],
}

async fn compute_top_hunters(
    ctx: &AnalyticsContext,
    scope: &RequestScope,
    filters: &AnalyticsFilters,
) -> Result<Vec<TopHunterEntry>, StoreError> {
    info!(?filters, "computing top hunters");
    let matches = scope.completed_matches(ctx.store.as_ref(), filters).await?;

    let mut players: HashMap<String, HunterAccumulator> = HashMap::new();
    for m in matches.iter() {
        for player in &m.players {
            let acc = players
                .entry(player.player_name.to_lowercase())
                .or_default();
            acc.matches_played += 1;
            for (slot, kind) in AnimalKind::ALL.iter().enumerate() {
                acc.kills[slot] += player.kills_of(*kind);
            }
        }
    }

    let mut entries: Vec<TopHunterEntry> = players
        .into_iter()
        .map(|(player_name, acc)| {
            // Favorite is the first maximal counter in enumeration
            // order; strict comparison keeps earlier kinds on ties.
            let mut favorite = (AnimalKind::ALL[0], acc.kills[0]);
            for (slot, kind) in AnimalKind::ALL.iter().enumerate().skip(1) {
                if acc.kills[slot] > favorite.1 {
                    favorite = (*kind, acc.kills[slot]);
                }
            }
            let total_kills: i64 = acc.kills.iter().sum();
            TopHunterEntry {
                player_name,
                total_kills,
                favorite_animal: if favorite.1 > 0 {
                    favorite.0.label().to_string()
                } else {
                    "None".to_string()
                },
                matches_played: acc.matches_played,
            }
        })
        .filter(|entry| entry.total_kills > 0)
        .collect();

    entries.sort_by(|a, b| {
        b.total_kills
            .cmp(&a.total_kills)
            .then_with(|| a.player_name.cmp(&b.player_name))
    });
    entries.truncate(filters.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT));
    Ok(entries)
}

/// Top healers across the filtered matches, ranked by combined self and
/// ally healing. Players with zero healing are dropped; at most `limit`
/// entries (default 10) are returned.
pub async fn top_healers(
    ctx: &AnalyticsContext,
    scope: &RequestScope,
    filters: &AnalyticsFilters,
) -> Vec<TopHealerEntry> {
    ctx.cache
        .get_or_compute("top_healers", filters, || async {
            match compute_top_healers(ctx, scope, filters).await {
                Ok(entries) => entries,
                Err(err) => {
                    error!(operation = "top_healers", ?filters, %err, "aggregation failed");
                    Vec::new()
                }
            }
        })
        .await
}

async fn compute_top_healers(
    ctx: &AnalyticsContext,
    scope: &RequestScope,
    filters: &AnalyticsFilters,
) -> Result<Vec<TopHealerEntry>, StoreError> {
    info!(?filters, "computing top healers");
    let matches = scope.completed_matches(ctx.store.as_ref(), filters).await?;

    let mut players: HashMap<String, TopHealerEntry> = HashMap::new();
    for m in matches.iter() {
        for player in &m.players {
            let name = player.player_name.to_lowercase();
            let entry = players.entry(name.clone()).or_insert_with(|| TopHealerEntry {
                player_name: name,
                total_healing: 0,
                self_healing: 0,
                ally_healing: 0,
                matches_played: 0,
            });
            entry.matches_played += 1;
            entry.self_healing += player.self_healing.unwrap_or(0);
            entry.ally_healing += player.ally_healing.unwrap_or(0);
            entry.total_healing = entry.self_healing + entry.ally_healing;
        }
    }

    let mut entries: Vec<TopHealerEntry> = players
        .into_values()
        .filter(|entry| entry.total_healing > 0)
        .collect();
    entries.sort_by(|a, b| {
        b.total_healing
            .cmp(&a.total_healing)
            .then_with(|| a.player_name.cmp(&b.player_name))
    });
    entries.truncate(filters.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT));
    Ok(entries)
}
