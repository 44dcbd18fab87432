//! Match record model: one played or scheduled contest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::document::{
    bool_field, datetime_field, datetime_value, i64_field, opt_str_field, str_array_field,
    str_field, Document,
};
use super::{DocId, Participant};

/// Lifecycle state of a match.
///
/// A scheduled match later becomes completed through a separate workflow;
/// once fetched, both states are treated as immutable facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchState {
    Scheduled,
    Completed,
}

impl MatchState {
    /// Parse a stored state value. Unknown values default to `Completed`
    /// because pre-scheduling documents carried no state field at all.
    pub fn parse(value: &str) -> Self {
        match value {
            "scheduled" => MatchState::Scheduled,
            _ => MatchState::Completed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchState::Scheduled => "scheduled",
            MatchState::Completed => "completed",
        }
    }
}

impl std::fmt::Display for MatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One played or scheduled contest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    /// Store-assigned document id
    pub id: DocId,

    /// Stable integer sequence, unique across non-deleted matches
    pub match_number: i64,

    /// Lifecycle state
    pub state: MatchState,

    /// When the match is due (scheduled matches only)
    pub scheduled_at: Option<DateTime<Utc>>,

    /// When the match was played (completed matches only)
    pub played_at: Option<DateTime<Utc>>,

    /// Duration in seconds (completed matches only)
    pub duration_seconds: i64,

    /// Map the match was played on
    pub map_name: String,

    /// Free-form grouping label, e.g. "1v1"
    pub category: Option<String>,

    /// Whether the result has been verified
    pub verified: bool,

    /// Intended team split for scheduled matches, e.g. "2v2"
    pub team_size: Option<String>,

    /// Denormalized participant names for quick access (completed only)
    pub player_names: Vec<String>,

    /// Number of participants (completed only)
    pub player_count: i64,

    /// Soft-delete marker; all queries exclude deleted matches
    pub is_deleted: bool,

    /// When the match was soft-deleted
    pub deleted_at: Option<DateTime<Utc>>,

    /// When this record was created
    pub created_at: DateTime<Utc>,

    /// When this record was last updated
    pub updated_at: DateTime<Utc>,
}

impl Match {
    /// Convert an untyped stored document into a typed match.
    ///
    /// Pure and total: missing or malformed fields degrade to defaults
    /// (numbers to 0, strings to empty, booleans to false, timestamps to
    /// `None`, `created_at`/`updated_at` to the epoch).
    pub fn from_document(id: DocId, doc: &Document) -> Self {
        let state = MatchState::parse(&str_field(doc, "state"));
        let player_names = str_array_field(doc, "playerNames");
        let player_count = match doc.get("playerCount") {
            Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
            _ => player_names.len() as i64,
        };

        Self {
            id,
            match_number: i64_field(doc, "matchNumber"),
            state,
            scheduled_at: datetime_field(doc, "scheduledAt"),
            played_at: datetime_field(doc, "playedAt"),
            duration_seconds: i64_field(doc, "durationSeconds"),
            map_name: str_field(doc, "mapName"),
            category: opt_str_field(doc, "category"),
            verified: bool_field(doc, "verified"),
            team_size: opt_str_field(doc, "teamSize"),
            player_names,
            player_count,
            is_deleted: bool_field(doc, "isDeleted"),
            deleted_at: datetime_field(doc, "deletedAt"),
            created_at: datetime_field(doc, "createdAt").unwrap_or(DateTime::UNIX_EPOCH),
            updated_at: datetime_field(doc, "updatedAt").unwrap_or(DateTime::UNIX_EPOCH),
        }
    }

    /// Serialize back to a stored document (mutation path).
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert("matchNumber".into(), Value::from(self.match_number));
        doc.insert("state".into(), Value::from(self.state.as_str()));
        if let Some(at) = self.scheduled_at {
            doc.insert("scheduledAt".into(), datetime_value(at));
        }
        if let Some(at) = self.played_at {
            doc.insert("playedAt".into(), datetime_value(at));
        }
        if self.state == MatchState::Completed {
            doc.insert("durationSeconds".into(), Value::from(self.duration_seconds));
            doc.insert("mapName".into(), Value::from(self.map_name.clone()));
            doc.insert("verified".into(), Value::from(self.verified));
            doc.insert(
                "playerNames".into(),
                Value::from(self.player_names.clone()),
            );
            doc.insert("playerCount".into(), Value::from(self.player_count));
        }
        if let Some(ref category) = self.category {
            doc.insert("category".into(), Value::from(category.clone()));
        }
        if let Some(ref team_size) = self.team_size {
            doc.insert("teamSize".into(), Value::from(team_size.clone()));
        }
        doc.insert("isDeleted".into(), Value::from(self.is_deleted));
        if let Some(at) = self.deleted_at {
            doc.insert("deletedAt".into(), datetime_value(at));
        }
        doc.insert("createdAt".into(), datetime_value(self.created_at));
        doc.insert("updatedAt".into(), datetime_value(self.updated_at));
        doc
    }

    /// Create a completed match record.
    pub fn completed(match_number: i64, played_at: DateTime<Utc>) -> Self {
        Self {
            id: DocId::generate(),
            match_number,
            state: MatchState::Completed,
            scheduled_at: None,
            played_at: Some(played_at),
            duration_seconds: 0,
            map_name: String::new(),
            category: None,
            verified: false,
            team_size: None,
            player_names: Vec::new(),
            player_count: 0,
            is_deleted: false,
            deleted_at: None,
            created_at: played_at,
            updated_at: played_at,
        }
    }

    /// Create a scheduled match record.
    pub fn scheduled(match_number: i64, scheduled_at: DateTime<Utc>) -> Self {
        Self {
            id: DocId::generate(),
            match_number,
            state: MatchState::Scheduled,
            scheduled_at: Some(scheduled_at),
            played_at: None,
            duration_seconds: 0,
            map_name: String::new(),
            category: None,
            verified: false,
            team_size: None,
            player_names: Vec::new(),
            player_count: 0,
            is_deleted: false,
            deleted_at: None,
            created_at: scheduled_at,
            updated_at: scheduled_at,
        }
    }

    /// Builder method to set the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Builder method to set the duration.
    pub fn with_duration(mut self, seconds: i64) -> Self {
        self.duration_seconds = seconds;
        self
    }

    /// Builder method to set the creation timestamp.
    pub fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self.updated_at = at;
        self
    }
}

/// A match joined with its participant list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchWithPlayers {
    #[serde(flatten)]
    pub record: Match,
    pub players: Vec<Participant>,
}
