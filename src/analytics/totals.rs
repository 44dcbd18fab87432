//! Aggregate stat totals and the animal-kills distribution.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::cache::RequestScope;
use crate::models::{AnalyticsFilters, AnimalKind};
use crate::store::StoreError;

use super::AnalyticsContext;

/// Healing totals, split by target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealingTotals {
    pub self_healing: i64,
    pub ally_healing: i64,
    pub total: i64,
}

/// Per-animal kill totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimalKillTotals {
    pub elk: i64,
    pub hawk: i64,
    pub snake: i64,
    pub wolf: i64,
    pub bear: i64,
    pub panther: i64,
    pub total: i64,
}

impl AnimalKillTotals {
    pub fn of(&self, kind: AnimalKind) -> i64 {
        match kind {
            AnimalKind::Elk => self.elk,
            AnimalKind::Hawk => self.hawk,
            AnimalKind::Snake => self.snake,
            AnimalKind::Wolf => self.wolf,
            AnimalKind::Bear => self.bear,
            AnimalKind::Panther => self.panther,
        }
    }

    fn add(&mut self, kind: AnimalKind, count: i64) {
        match kind {
            AnimalKind::Elk => self.elk += count,
            AnimalKind::Hawk => self.hawk += count,
            AnimalKind::Snake => self.snake += count,
            AnimalKind::Wolf => self.wolf += count,
            AnimalKind::Bear => self.bear += count,
            AnimalKind::Panther => self.panther += count,
        }
        self.total += count;
    }
}

/// Per-match averages of the aggregate counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchAverages {
    pub damage_dealt: f64,
    pub self_healing: f64,
    pub ally_healing: f64,
    pub meat_eaten: f64,
    pub gold_acquired: f64,
    pub animal_kills: f64,
}

/// Sums of every stat counter across all filtered matches, with derived
/// per-match averages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateTotals {
    pub total_matches: u32,
    pub total_damage_dealt: i64,
    pub healing: HealingTotals,
    pub total_meat_eaten: i64,
    pub total_gold_acquired: i64,
    pub animal_kills: AnimalKillTotals,
    pub averages_per_match: MatchAverages,
}

/// One slice of the animal-kills distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalKillsSlice {
    pub animal: AnimalKind,
    pub count: i64,
    pub percentage: f64,
}

/// Sum damage/healing/resource and kill counters across all filtered
/// matches and participants. Averages divide by the match count floored
/// to 1, so an empty result set yields zeros rather than NaN.
pub async fn aggregate_totals(
    ctx: &AnalyticsContext,
    scope: &RequestScope,
    filters: &AnalyticsFilters,
) -> AggregateTotals {
    ctx.cache
        .get_or_compute("totals", filters, || async {
            match compute_totals(ctx, scope, filters).await {
                Ok(totals) => totals,
                Err(err) => {
                    error!(operation = "aggregate_totals", ?filters, %err, "aggregation failed");
                    AggregateTotals::default()
                }
            }
        })
        .await
}

async fn compute_totals(
    ctx: &AnalyticsContext,
    scope: &RequestScope,
    filters: &AnalyticsFilters,
) -> Result<AggregateTotals, StoreError> {
    info!(?filters, "computing aggregate totals");
    let matches = scope.completed_matches(ctx.store.as_ref(), filters).await?;

    let mut totals = AggregateTotals::default();
    for m in matches.iter() {
        totals.total_matches += 1;
        for player in &m.players {
            totals.total_damage_dealt += player.damage_dealt.unwrap_or(0);
            totals.healing.self_healing += player.self_healing.unwrap_or(0);
            totals.healing.ally_healing += player.ally_healing.unwrap_or(0);
            totals.total_meat_eaten += player.meat_eaten.unwrap_or(0);
            totals.total_gold_acquired += player.gold_gathered();
            for kind in AnimalKind::ALL {
                totals.animal_kills.add(kind, player.kills_of(kind));
            }
        }
    }
    totals.healing.total = totals.healing.self_healing + totals.healing.ally_healing;

    // Floor the divisor to 1 to avoid dividing by zero on empty sets.
    let match_count = totals.total_matches.max(1) as f64;
    totals.averages_per_match = MatchAverages {
        damage_dealt: totals.total_damage_dealt as f64 / match_count,
        self_healing: totals.healing.self_healing as f64 / match_count,
        ally_healing: totals.healing.ally_healing as f64 / match_count,
        meat_eaten: totals.total_meat_eaten as f64 / match_count,
        gold_acquired: totals.total_gold_acquired as f64 / match_count,
        animal_kills: totals.animal_kills.total as f64 / match_count,
    };

    Ok(totals)
}

/// Slice the aggregate kill totals into a per-animal distribution,
/// sorted by count descending.
pub async fn animal_kills_distribution(
    ctx: &AnalyticsContext,
    scope: &RequestScope,
    filters: &AnalyticsFilters,
) -> Vec<AnimalKillsSlice> {
    let totals = aggregate_totals(ctx, scope, filters).await;

    // Floor the total to 1 so empty data yields 0% slices.
    let total = totals.animal_kills.total.max(1) as f64;
    let mut slices: Vec<AnimalKillsSlice> = AnimalKind::ALL
        .iter()
        .map(|kind| AnimalKillsSlice {
            animal: *kind,
            count: totals.animal_kills.of(*kind),
            percentage: totals.animal_kills.of(*kind) as f64 / total * 100.0,
        })
        .collect();
    slices.sort_by(|a, b| b.count.cmp(&a.count));
    slices
}
