//! Batch relationship loader.
//!
//! Joins parent match records with their participant child collections.
//! Child fetches for different matches run concurrently; a single failed
//! fetch fails the whole batch (no partial results). Participants within
//! one match are always returned sorted by seat order.

use std::collections::HashMap;

use futures::future::try_join_all;
use serde::Serialize;
use tracing::debug;

use crate::models::{DocId, MatchFilters, MatchWithPlayers, Participant};
use crate::store::{DocumentStore, StoreError};

use super::MatchPage;

/// One page of matches joined with their participants.
#[derive(Debug, Clone, Serialize)]
pub struct MatchPageWithPlayers {
    pub matches: Vec<MatchWithPlayers>,
    pub next_cursor: Option<DocId>,
    pub has_more: bool,
}

/// Fetch the participant lists for a set of matches concurrently.
///
/// Returns a map keyed by match id; every requested id is present, with
/// an empty list when the match has no participants. Empty input returns
/// an empty map without issuing any fetch.
pub async fn load_participants(
    store: &dyn DocumentStore,
    match_ids: &[DocId],
) -> Result<HashMap<DocId, Vec<Participant>>, StoreError> {
    if match_ids.is_empty() {
        return Ok(HashMap::new());
    }

    // One child fetch per match, in parallel. No ordering is guaranteed
    // between matches' fetches; the fail-fast join aborts on first error.
    let fetches = match_ids.iter().map(|match_id| async move {
        let docs = store.list_participants(match_id).await?;
        let mut players: Vec<Participant> = docs
            .into_iter()
            .map(|doc| Participant::from_document(doc.id, &doc.fields))
            .collect();
        players.sort_by_key(|p| p.position_index);
        Ok::<_, StoreError>((match_id.clone(), players))
    });

    let results = try_join_all(fetches).await?;
    let total_players: usize = results.iter().map(|(_, players)| players.len()).sum();
    debug!(
        match_count = match_ids.len(),
        total_players, "batch fetched participants"
    );

    Ok(results.into_iter().collect())
}

/// Find matches and join each with its participant list.
pub async fn find_with_participants(
    store: &dyn DocumentStore,
    filters: &MatchFilters,
) -> Result<MatchPageWithPlayers, StoreError> {
    let page: MatchPage = super::find(store, filters).await?;

    if page.matches.is_empty() {
        return Ok(MatchPageWithPlayers {
            matches: Vec::new(),
            next_cursor: page.next_cursor,
            has_more: page.has_more,
        });
    }

    let match_ids: Vec<DocId> = page.matches.iter().map(|m| m.id.clone()).collect();
    let mut players_map = load_participants(store, &match_ids).await?;

    let matches = page
        .matches
        .into_iter()
        .map(|record| {
            let players = players_map.remove(&record.id).unwrap_or_default();
            MatchWithPlayers { record, players }
        })
        .collect();

    Ok(MatchPageWithPlayers {
        matches,
        next_cursor: page.next_cursor,
        has_more: page.has_more,
    })
}
