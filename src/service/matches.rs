//! Match creation, update, deletion and single-match lookup.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::cache::InvalidationSender;
use crate::models::{
    datetime_value, DocId, Document, Match, MatchFilters, MatchWithPlayers, Participant,
    ResultFlag,
};
use crate::query;
use crate::store::{DocumentStore, MatchQuery, StoreError};

use super::rating::apply_match_ratings;
use super::ServiceError;

/// Participant payload for match creation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateParticipant {
    pub name: String,
    pub position_index: i64,
    pub result_flag: ResultFlag,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub random_class: bool,
    #[serde(default)]
    pub kills: Option<i64>,
    #[serde(default)]
    pub deaths: Option<i64>,
    #[serde(default)]
    pub assists: Option<i64>,
    #[serde(default)]
    pub gold: Option<i64>,
    #[serde(default)]
    pub damage_dealt: Option<i64>,
    #[serde(default)]
    pub damage_taken: Option<i64>,
    #[serde(default)]
    pub self_healing: Option<i64>,
    #[serde(default)]
    pub ally_healing: Option<i64>,
    #[serde(default)]
    pub meat_eaten: Option<i64>,
    #[serde(default)]
    pub gold_acquired: Option<i64>,
    #[serde(default)]
    pub kills_elk: Option<i64>,
    #[serde(default)]
    pub kills_hawk: Option<i64>,
    #[serde(default)]
    pub kills_snake: Option<i64>,
    #[serde(default)]
    pub kills_wolf: Option<i64>,
    #[serde(default)]
    pub kills_bear: Option<i64>,
    #[serde(default)]
    pub kills_panther: Option<i64>,
}

impl CreateParticipant {
    fn into_participant(self, match_id: DocId, created_at: DateTime<Utc>) -> Participant {
        let mut p = Participant::new(match_id, self.name, self.position_index, self.result_flag);
        p.class = self.class;
        p.random_class = self.random_class;
        p.kills = self.kills;
        p.deaths = self.deaths;
        p.assists = self.assists;
        p.gold = self.gold;
        p.damage_dealt = self.damage_dealt;
        p.damage_taken = self.damage_taken;
        p.self_healing = self.self_healing;
        p.ally_healing = self.ally_healing;
        p.meat_eaten = self.meat_eaten;
        p.gold_acquired = self.gold_acquired;
        p.kills_elk = self.kills_elk;
        p.kills_hawk = self.kills_hawk;
        p.kills_snake = self.kills_snake;
        p.kills_wolf = self.kills_wolf;
        p.kills_bear = self.kills_bear;
        p.kills_panther = self.kills_panther;
        p.created_at = created_at;
        p
    }
}

/// Payload for creating a completed match.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCompletedMatch {
    pub match_number: i64,
    pub played_at: DateTime<Utc>,
    #[serde(default)]
    pub duration_seconds: i64,
    #[serde(default)]
    pub map_name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub verified: bool,
    pub players: Vec<CreateParticipant>,
}

/// Payload for creating a scheduled match.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateScheduledMatch {
    /// Auto-assigned when not provided.
    #[serde(default)]
    pub match_number: Option<i64>,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub team_size: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Fields accepted by match updates; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMatch {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub map_name: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<i64>,
    #[serde(default)]
    pub verified: Option<bool>,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub team_size: Option<String>,
}

/// The next free match number: one past the highest number in the
/// store, deleted matches included.
pub async fn next_match_number(store: &dyn DocumentStore) -> Result<i64, StoreError> {
    let docs = store.query_matches(&MatchQuery::new()).await?;
    let max = docs
        .iter()
        .map(|doc| Match::from_document(doc.id.clone(), &doc.fields).match_number)
        .max()
        .unwrap_or(0);
    Ok(max + 1)
}

/// Create a completed match with its participants.
///
/// Requires a positive match number, at least two participants, and a
/// match number not used by any non-deleted match. After the write the
/// rating engine and cache invalidation run as best-effort side effects:
/// their failure never fails the creation.
pub async fn create_completed_match(
    store: &dyn DocumentStore,
    invalidation: &InvalidationSender,
    data: CreateCompletedMatch,
) -> Result<DocId, ServiceError> {
    if data.match_number <= 0 {
        return Err(ServiceError::Invalid(
            "a positive match number is required".into(),
        ));
    }
    if data.players.len() < 2 {
        return Err(ServiceError::Invalid(
            "a completed match requires at least 2 participants".into(),
        ));
    }

    // Reject duplicates among non-deleted matches.
    let existing = query::find(
        store,
        &MatchFilters {
            match_number: Some(data.match_number),
            limit: Some(1),
            ..MatchFilters::default()
        },
    )
    .await?;
    if !existing.matches.is_empty() {
        return Err(ServiceError::DuplicateMatchNumber(data.match_number));
    }

    let now = Utc::now();
    let mut record = Match::completed(data.match_number, data.played_at);
    record.duration_seconds = data.duration_seconds;
    record.map_name = data.map_name;
    record.category = data.category.clone();
    record.verified = data.verified;
    record.player_names = data.players.iter().map(|p| p.name.clone()).collect();
    record.player_count = data.players.len() as i64;
    record.created_at = now;
    record.updated_at = now;

    let participants: Vec<Document> = data
        .players
        .into_iter()
        .map(|p| {
            p.into_participant(DocId::from("pending"), now)
                .to_document()
        })
        .collect();

    let id = store.insert_match(record.to_document(), participants).await?;

    if let Err(err) = apply_match_ratings(store, &id).await {
        warn!(%id, %err, "failed to update rating scores");
    }

    invalidation.send(data.category);

    info!(%id, match_number = data.match_number, "completed match created");
    Ok(id)
}

/// Create a scheduled match. Participants join through a separate
/// workflow, so none are written here and no duplicate check applies.
pub async fn create_scheduled_match(
    store: &dyn DocumentStore,
    invalidation: &InvalidationSender,
    data: CreateScheduledMatch,
) -> Result<DocId, ServiceError> {
    let match_number = match data.match_number {
        Some(number) if number > 0 => number,
        Some(_) => {
            return Err(ServiceError::Invalid(
                "a positive match number is required".into(),
            ))
        }
        None => next_match_number(store).await?,
    };

    let now = Utc::now();
    let mut record = Match::scheduled(match_number, data.scheduled_at);
    record.team_size = data.team_size;
    record.category = data.category.clone();
    record.created_at = now;
    record.updated_at = now;

    let id = store.insert_match(record.to_document(), Vec::new()).await?;
    invalidation.send(data.category);

    info!(%id, match_number, "scheduled match created");
    Ok(id)
}

/// Merge field updates into a match and bump its update timestamp.
pub async fn update_match(
    store: &dyn DocumentStore,
    invalidation: &InvalidationSender,
    id: &DocId,
    update: UpdateMatch,
) -> Result<(), ServiceError> {
    let mut fields = Document::new();
    if let Some(category) = update.category.clone() {
        fields.insert("category".into(), Value::from(category));
    }
    if let Some(map_name) = update.map_name {
        fields.insert("mapName".into(), Value::from(map_name));
    }
    if let Some(duration) = update.duration_seconds {
        fields.insert("durationSeconds".into(), Value::from(duration));
    }
    if let Some(verified) = update.verified {
        fields.insert("verified".into(), Value::from(verified));
    }
    if let Some(scheduled_at) = update.scheduled_at {
        fields.insert("scheduledAt".into(), datetime_value(scheduled_at));
    }
    if let Some(team_size) = update.team_size {
        fields.insert("teamSize".into(), Value::from(team_size));
    }
    fields.insert("updatedAt".into(), datetime_value(Utc::now()));

    store.update_match(id, fields).await?;

    // Invalidate under the match's effective category.
    let category = match store.get_match(id).await? {
        Some(doc) => Match::from_document(doc.id, &doc.fields).category,
        None => None,
    };
    invalidation.send(category.or(update.category));

    info!(%id, "match updated");
    Ok(())
}

/// Soft-delete a match. The record stays in the store but every query
/// excludes it from then on.
pub async fn delete_match(
    store: &dyn DocumentStore,
    invalidation: &InvalidationSender,
    id: &DocId,
) -> Result<(), ServiceError> {
    let Some(doc) = store.get_match(id).await? else {
        return Err(ServiceError::Store(StoreError::NotFound(id.to_string())));
    };
    let record = Match::from_document(doc.id, &doc.fields);

    let now = Utc::now();
    let mut fields = Document::new();
    fields.insert("isDeleted".into(), Value::from(true));
    fields.insert("deletedAt".into(), datetime_value(now));
    fields.insert("updatedAt".into(), datetime_value(now));
    store.update_match(id, fields).await?;

    invalidation.send(record.category);
    info!(%id, "match soft-deleted");
    Ok(())
}

/// Permanently remove a match and its participants.
pub async fn purge_match(
    store: &dyn DocumentStore,
    invalidation: &InvalidationSender,
    id: &DocId,
) -> Result<(), ServiceError> {
    let category = match store.get_match(id).await? {
        Some(doc) => Match::from_document(doc.id, &doc.fields).category,
        None => return Err(ServiceError::Store(StoreError::NotFound(id.to_string()))),
    };

    store.purge_match(id).await?;
    invalidation.send(category);
    info!(%id, "match purged");
    Ok(())
}

/// Fetch one match with its participants.
///
/// Missing and soft-deleted matches return `None` rather than an error;
/// a failing participant fetch propagates.
pub async fn get_match(
    store: &dyn DocumentStore,
    id: &DocId,
) -> Result<Option<MatchWithPlayers>, ServiceError> {
    let Some(doc) = store.get_match(id).await? else {
        info!(%id, "match not found");
        return Ok(None);
    };
    let record = Match::from_document(doc.id, &doc.fields);
    if record.is_deleted {
        info!(%id, "match is deleted");
        return Ok(None);
    }

    let mut players: Vec<Participant> = store
        .list_participants(id)
        .await?
        .into_iter()
        .map(|d| Participant::from_document(d.id, &d.fields))
        .collect();
    players.sort_by_key(|p| p.position_index);

    Ok(Some(MatchWithPlayers { record, players }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchState;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn sample_players() -> Vec<CreateParticipant> {
        vec![
            CreateParticipant {
                name: "Alice".into(),
                position_index: 0,
                result_flag: ResultFlag::Winner,
                class: Some("Hunter".into()),
                random_class: false,
                kills: None,
                deaths: None,
                assists: None,
                gold: None,
                damage_dealt: Some(900),
                damage_taken: None,
                self_healing: None,
                ally_healing: None,
                meat_eaten: None,
                gold_acquired: None,
                kills_elk: Some(2),
                kills_hawk: None,
                kills_snake: None,
                kills_wolf: None,
                kills_bear: None,
                kills_panther: None,
            },
            CreateParticipant {
                name: "Bob".into(),
                position_index: 1,
                result_flag: ResultFlag::Loser,
                class: None,
                random_class: false,
                kills: None,
                deaths: None,
                assists: None,
                gold: None,
                damage_dealt: None,
                damage_taken: None,
                self_healing: None,
                ally_healing: None,
                meat_eaten: None,
                gold_acquired: None,
                kills_elk: None,
                kills_hawk: None,
                kills_snake: None,
                kills_wolf: None,
                kills_bear: None,
                kills_panther: None,
            },
        ]
    }

    fn sample_match(number: i64) -> CreateCompletedMatch {
        CreateCompletedMatch {
            match_number: number,
            played_at: Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap(),
            duration_seconds: 1800,
            map_name: "Glacier".into(),
            category: Some("1v1".into()),
            verified: false,
            players: sample_players(),
        }
    }

    #[tokio::test]
    async fn test_create_completed_match() {
        let store = MemoryStore::new();
        let sender = InvalidationSender::disconnected();

        let id = create_completed_match(&store, &sender, sample_match(1))
            .await
            .unwrap();

        let fetched = get_match(&store, &id).await.unwrap().unwrap();
        assert_eq!(fetched.record.match_number, 1);
        assert_eq!(fetched.record.player_count, 2);
        assert_eq!(fetched.players.len(), 2);
        assert_eq!(fetched.players[0].player_name, "Alice");
        // The rating engine ran as a side effect.
        assert_eq!(fetched.players[0].rating_delta, Some(16.0));
    }

    #[tokio::test]
    async fn test_duplicate_match_number_rejected() {
        let store = MemoryStore::new();
        let sender = InvalidationSender::disconnected();

        create_completed_match(&store, &sender, sample_match(7))
            .await
            .unwrap();
        let err = create_completed_match(&store, &sender, sample_match(7))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateMatchNumber(7)));
    }

    #[tokio::test]
    async fn test_deleted_match_number_can_be_reused() {
        let store = MemoryStore::new();
        let sender = InvalidationSender::disconnected();

        let id = create_completed_match(&store, &sender, sample_match(7))
            .await
            .unwrap();
        delete_match(&store, &sender, &id).await.unwrap();

        // The number is unique among non-deleted matches only.
        create_completed_match(&store, &sender, sample_match(7))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_too_few_participants_rejected() {
        let store = MemoryStore::new();
        let sender = InvalidationSender::disconnected();

        let mut data = sample_match(1);
        data.players.truncate(1);
        let err = create_completed_match(&store, &sender, data).await.unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_invalid_match_number_rejected() {
        let store = MemoryStore::new();
        let sender = InvalidationSender::disconnected();
        let err = create_completed_match(&store, &sender, sample_match(0))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_create_scheduled_match_auto_number() {
        let store = MemoryStore::new();
        let sender = InvalidationSender::disconnected();

        create_completed_match(&store, &sender, sample_match(41))
            .await
            .unwrap();

        let id = create_scheduled_match(
            &store,
            &sender,
            CreateScheduledMatch {
                match_number: None,
                scheduled_at: Utc.with_ymd_and_hms(2024, 2, 1, 18, 0, 0).unwrap(),
                team_size: Some("2v2".into()),
                category: None,
            },
        )
        .await
        .unwrap();

        let fetched = get_match(&store, &id).await.unwrap().unwrap();
        assert_eq!(fetched.record.state, MatchState::Scheduled);
        assert_eq!(fetched.record.match_number, 42);
        assert_eq!(fetched.record.team_size.as_deref(), Some("2v2"));
        assert!(fetched.players.is_empty());
    }

    #[tokio::test]
    async fn test_update_match_merges_and_bumps_timestamp() {
        let store = MemoryStore::new();
        let sender = InvalidationSender::disconnected();
        let id = create_completed_match(&store, &sender, sample_match(1))
            .await
            .unwrap();

        update_match(
            &store,
            &sender,
            &id,
            UpdateMatch {
                verified: Some(true),
                map_name: Some("Tundra".into()),
                ..UpdateMatch::default()
            },
        )
        .await
        .unwrap();

        let fetched = get_match(&store, &id).await.unwrap().unwrap();
        assert!(fetched.record.verified);
        assert_eq!(fetched.record.map_name, "Tundra");
        // Untouched fields survive the merge.
        assert_eq!(fetched.record.duration_seconds, 1800);
    }

    #[tokio::test]
    async fn test_get_match_missing_and_deleted_return_none() {
        let store = MemoryStore::new();
        let sender = InvalidationSender::disconnected();

        assert!(get_match(&store, &DocId::from("nope")).await.unwrap().is_none());

        let id = create_completed_match(&store, &sender, sample_match(1))
            .await
            .unwrap();
        delete_match(&store, &sender, &id).await.unwrap();
        assert!(get_match(&store, &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_match_errors() {
        let store = MemoryStore::new();
        let sender = InvalidationSender::disconnected();
        let err = delete_match(&store, &sender, &DocId::from("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Store(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_purge_removes_match_and_children() {
        let store = MemoryStore::new();
        let sender = InvalidationSender::disconnected();
        let id = create_completed_match(&store, &sender, sample_match(1))
            .await
            .unwrap();

        purge_match(&store, &sender, &id).await.unwrap();
        assert!(get_match(&store, &id).await.unwrap().is_none());
        assert!(store.list_participants(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_next_match_number_counts_deleted() {
        let store = MemoryStore::new();
        let sender = InvalidationSender::disconnected();
        let id = create_completed_match(&store, &sender, sample_match(10))
            .await
            .unwrap();
        delete_match(&store, &sender, &id).await.unwrap();

        assert_eq!(next_match_number(&store).await.unwrap(), 11);
    }
}
