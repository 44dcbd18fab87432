//! Rating engine.
//!
//! Elo-style score updates applied after a completed match: each
//! participant is scored against the opposing team's average rating, the
//! resulting deltas are written back onto the participant documents, and
//! the players' stored per-category aggregates are updated.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{info, warn};

use crate::models::{
    normalize_player_name, DocId, Document, Match, Participant, PlayerProfile, ResultFlag,
    DEFAULT_CATEGORY, STARTING_SCORE,
};
use crate::store::{DocumentStore, StoreError};

/// Default K-factor for rating calculations.
pub const DEFAULT_K_FACTOR: f64 = 32.0;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rating change for one participant against an opponent rating.
///
/// `k × (actual − expected)` with the standard logistic expectation,
/// rounded to two decimals. Actual score is 1 for a win, 0 for a loss,
/// 0.5 for a draw.
pub fn rating_change(player: f64, opponent: f64, outcome: ResultFlag, k: f64) -> f64 {
    let expected = 1.0 / (1.0 + 10f64.powf((opponent - player) / 400.0));
    let actual = match outcome {
        ResultFlag::Winner => 1.0,
        ResultFlag::Loser => 0.0,
        ResultFlag::Drawer => 0.5,
    };
    round2(k * (actual - expected))
}

/// Average rating of a team; empty teams rate at the starting score.
pub fn team_rating(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return STARTING_SCORE;
    }
    round2(scores.iter().sum::<f64>() / scores.len() as f64)
}

/// Apply rating updates for a completed match.
///
/// Writes `ratingDelta`/`ratingBefore`/`ratingAfter` onto each
/// participant document and folds the outcome into each player's stored
/// per-category aggregate. Matches that cannot be rated (missing, fewer
/// than two participants) are skipped with a warning rather than failing
/// the caller.
pub async fn apply_match_ratings(
    store: &dyn DocumentStore,
    match_id: &DocId,
) -> Result<(), StoreError> {
    let Some(doc) = store.get_match(match_id).await? else {
        warn!(%match_id, "match not found for rating update");
        return Ok(());
    };
    let record = Match::from_document(doc.id, &doc.fields);

    let participant_docs = store.list_participants(match_id).await?;
    let players: Vec<Participant> = participant_docs
        .iter()
        .map(|d| Participant::from_document(d.id.clone(), &d.fields))
        .collect();
    if players.len() < 2 {
        warn!(%match_id, "not enough participants for rating update");
        return Ok(());
    }

    let category = record
        .category
        .clone()
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

    // Current scores, one lookup per distinct player.
    let mut scores: HashMap<String, f64> = HashMap::new();
    for player in &players {
        let name = normalize_player_name(&player.player_name);
        if scores.contains_key(&name) {
            continue;
        }
        let score = match store.get_player_profile(&name).await? {
            Some(doc) => PlayerProfile::from_document(&doc).score(&category),
            None => STARTING_SCORE,
        };
        scores.insert(name, score);
    }

    let team_scores = |flag: ResultFlag| -> Vec<f64> {
        players
            .iter()
            .filter(|p| p.result_flag == flag)
            .map(|p| scores[&normalize_player_name(&p.player_name)])
            .collect()
    };
    let winner_team = team_rating(&team_scores(ResultFlag::Winner));
    let loser_team = team_rating(&team_scores(ResultFlag::Loser));

    let has_winners = players.iter().any(|p| p.result_flag == ResultFlag::Winner);
    let has_losers = players.iter().any(|p| p.result_flag == ResultFlag::Loser);

    let mut changes: HashMap<String, f64> = HashMap::new();
    for player in &players {
        let name = normalize_player_name(&player.player_name);
        let score = scores[&name];
        let delta = match player.result_flag {
            ResultFlag::Winner if has_losers => {
                rating_change(score, loser_team, ResultFlag::Winner, DEFAULT_K_FACTOR)
            }
            ResultFlag::Loser if has_winners => {
                rating_change(score, winner_team, ResultFlag::Loser, DEFAULT_K_FACTOR)
            }
            ResultFlag::Drawer => {
                let opponent = if has_winners { winner_team } else { loser_team };
                rating_change(score, opponent, ResultFlag::Drawer, DEFAULT_K_FACTOR)
            }
            // One-sided matches carry no rating movement.
            _ => 0.0,
        };
        changes.insert(name, delta);
    }

    // Write deltas back onto the participant documents.
    for (participant_doc, player) in participant_docs.iter().zip(&players) {
        let name = normalize_player_name(&player.player_name);
        let before = scores[&name];
        let delta = changes[&name];

        let mut fields = Document::new();
        fields.insert("ratingDelta".into(), Value::from(delta));
        fields.insert("ratingBefore".into(), Value::from(before));
        fields.insert("ratingAfter".into(), Value::from(round2(before + delta)));
        store
            .update_participant(match_id, &participant_doc.id, fields)
            .await?;
    }

    // Fold the outcome into each player's stored aggregates. A player
    // appearing twice in one match is counted once, like the scores map.
    let mut updated: HashMap<String, ResultFlag> = HashMap::new();
    for player in &players {
        let name = normalize_player_name(&player.player_name);
        updated.entry(name).or_insert(player.result_flag);
    }
    for (name, flag) in updated {
        let mut profile = match store.get_player_profile(&name).await? {
            Some(doc) => PlayerProfile::from_document(&doc),
            None => PlayerProfile::new(name.clone()),
        };
        let record = profile.category_mut(&category);
        record.score = round2(record.score + changes[&name]);
        record.games += 1;
        match flag {
            ResultFlag::Winner => record.wins += 1,
            ResultFlag::Loser => record.losses += 1,
            ResultFlag::Drawer => record.draws += 1,
        }
        store.upsert_player_profile(&name, profile.to_document()).await?;
    }

    info!(%match_id, category, players = players.len(), "rating scores updated");
    Ok(())
}
