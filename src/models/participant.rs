//! Participant model: one player's record within one match.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::document::{
    bool_field, datetime_field, datetime_value, i64_field, opt_f64_field, opt_i64_field,
    opt_str_field, str_field, Document,
};
use super::DocId;

/// Outcome of a match for one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultFlag {
    Winner,
    Loser,
    Drawer,
}

impl ResultFlag {
    /// Parse a stored flag value. Unknown values degrade to `Drawer`.
    pub fn parse(value: &str) -> Self {
        match value {
            "winner" => ResultFlag::Winner,
            "loser" => ResultFlag::Loser,
            _ => ResultFlag::Drawer,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultFlag::Winner => "winner",
            ResultFlag::Loser => "loser",
            ResultFlag::Drawer => "drawer",
        }
    }
}

/// The fixed set of per-kind kill counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimalKind {
    Elk,
    Hawk,
    Snake,
    Wolf,
    Bear,
    Panther,
}

impl AnimalKind {
    /// All kinds, in enumeration order. Tie-breaks elsewhere rely on
    /// this order being stable.
    pub const ALL: [AnimalKind; 6] = [
        AnimalKind::Elk,
        AnimalKind::Hawk,
        AnimalKind::Snake,
        AnimalKind::Wolf,
        AnimalKind::Bear,
        AnimalKind::Panther,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AnimalKind::Elk => "Elk",
            AnimalKind::Hawk => "Hawk",
            AnimalKind::Snake => "Snake",
            AnimalKind::Wolf => "Wolf",
            AnimalKind::Bear => "Bear",
            AnimalKind::Panther => "Panther",
        }
    }

    fn doc_field(&self) -> &'static str {
        match self {
            AnimalKind::Elk => "killsElk",
            AnimalKind::Hawk => "killsHawk",
            AnimalKind::Snake => "killsSnake",
            AnimalKind::Wolf => "killsWolf",
            AnimalKind::Bear => "killsBear",
            AnimalKind::Panther => "killsPanther",
        }
    }
}

impl std::fmt::Display for AnimalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One player's record within one match.
///
/// Performance counters are optional in storage; absent counters are
/// treated as 0 by every aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    /// Store-assigned document id
    pub id: DocId,

    /// Owning match
    pub match_id: DocId,

    /// Player name as recorded for this match
    pub player_name: String,

    /// Stable per-match seat order (deterministic secondary sort)
    pub position_index: i64,

    /// Outcome flag
    pub result_flag: ResultFlag,

    /// Class played, if recorded
    pub class: Option<String>,

    /// Whether the class was randomly assigned
    pub random_class: bool,

    /// Signed rating change applied for this match
    pub rating_delta: Option<f64>,

    /// Rating before the change was applied
    pub rating_before: Option<f64>,

    /// Rating after the change was applied
    pub rating_after: Option<f64>,

    // Combat stats
    pub kills: Option<i64>,
    pub deaths: Option<i64>,
    pub assists: Option<i64>,
    pub gold: Option<i64>,
    pub damage_dealt: Option<i64>,
    pub damage_taken: Option<i64>,

    // Survival stats (schema v2+)
    pub self_healing: Option<i64>,
    pub ally_healing: Option<i64>,
    pub meat_eaten: Option<i64>,
    pub gold_acquired: Option<i64>,

    // Animal kill counts
    pub kills_elk: Option<i64>,
    pub kills_hawk: Option<i64>,
    pub kills_snake: Option<i64>,
    pub kills_wolf: Option<i64>,
    pub kills_bear: Option<i64>,
    pub kills_panther: Option<i64>,

    /// When this record was created
    pub created_at: DateTime<Utc>,
}

impl Participant {
    /// Convert an untyped stored document into a typed participant.
    /// Pure and total; malformed values degrade to defaults.
    pub fn from_document(id: DocId, doc: &Document) -> Self {
        Self {
            id,
            match_id: DocId::from(str_field(doc, "matchId")),
            player_name: str_field(doc, "playerName"),
            position_index: i64_field(doc, "positionIndex"),
            result_flag: ResultFlag::parse(&str_field(doc, "resultFlag")),
            class: opt_str_field(doc, "class"),
            random_class: bool_field(doc, "randomClass"),
            rating_delta: opt_f64_field(doc, "ratingDelta"),
            rating_before: opt_f64_field(doc, "ratingBefore"),
            rating_after: opt_f64_field(doc, "ratingAfter"),
            kills: opt_i64_field(doc, "kills"),
            deaths: opt_i64_field(doc, "deaths"),
            assists: opt_i64_field(doc, "assists"),
            gold: opt_i64_field(doc, "gold"),
            damage_dealt: opt_i64_field(doc, "damageDealt"),
            damage_taken: opt_i64_field(doc, "damageTaken"),
            self_healing: opt_i64_field(doc, "selfHealing"),
            ally_healing: opt_i64_field(doc, "allyHealing"),
            meat_eaten: opt_i64_field(doc, "meatEaten"),
            gold_acquired: opt_i64_field(doc, "goldAcquired"),
            kills_elk: opt_i64_field(doc, "killsElk"),
            kills_hawk: opt_i64_field(doc, "killsHawk"),
            kills_snake: opt_i64_field(doc, "killsSnake"),
            kills_wolf: opt_i64_field(doc, "killsWolf"),
            kills_bear: opt_i64_field(doc, "killsBear"),
            kills_panther: opt_i64_field(doc, "killsPanther"),
            created_at: datetime_field(doc, "createdAt").unwrap_or(DateTime::UNIX_EPOCH),
        }
    }

    /// Serialize back to a stored document. Absent counters are omitted
    /// rather than written as zeros, matching how documents were written
    /// historically.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert("matchId".into(), Value::from(self.match_id.as_str()));
        doc.insert("playerName".into(), Value::from(self.player_name.clone()));
        doc.insert("positionIndex".into(), Value::from(self.position_index));
        doc.insert("resultFlag".into(), Value::from(self.result_flag.as_str()));
        if let Some(ref class) = self.class {
            doc.insert("class".into(), Value::from(class.clone()));
        }
        if self.random_class {
            doc.insert("randomClass".into(), Value::from(true));
        }
        let floats: [(&str, Option<f64>); 3] = [
            ("ratingDelta", self.rating_delta),
            ("ratingBefore", self.rating_before),
            ("ratingAfter", self.rating_after),
        ];
        for (field, value) in floats {
            if let Some(v) = value {
                doc.insert(field.into(), Value::from(v));
            }
        }
        let counters: [(&str, Option<i64>); 16] = [
            ("kills", self.kills),
            ("deaths", self.deaths),
            ("assists", self.assists),
            ("gold", self.gold),
            ("damageDealt", self.damage_dealt),
            ("damageTaken", self.damage_taken),
            ("selfHealing", self.self_healing),
            ("allyHealing", self.ally_healing),
            ("meatEaten", self.meat_eaten),
            ("goldAcquired", self.gold_acquired),
            ("killsElk", self.kills_elk),
            ("killsHawk", self.kills_hawk),
            ("killsSnake", self.kills_snake),
            ("killsWolf", self.kills_wolf),
            ("killsBear", self.kills_bear),
            ("killsPanther", self.kills_panther),
        ];
        for (field, value) in counters {
            if let Some(v) = value {
                doc.insert(field.into(), Value::from(v));
            }
        }
        doc.insert("createdAt".into(), datetime_value(self.created_at));
        doc
    }

    /// Create a participant with the given seat and outcome.
    pub fn new(
        match_id: DocId,
        player_name: impl Into<String>,
        position_index: i64,
        result_flag: ResultFlag,
    ) -> Self {
        Self {
            id: DocId::generate(),
            match_id,
            player_name: player_name.into(),
            position_index,
            result_flag,
            class: None,
            random_class: false,
            rating_delta: None,
            rating_before: None,
            rating_after: None,
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
            created_at: DateTime::UNIX_EPOCH,
        }
    }

    /// Builder method to set the class.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// Builder method to set the rating delta.
    pub fn with_rating_delta(mut self, delta: f64) -> Self {
        self.rating_delta = Some(delta);
        self
    }

    /// Kill count for one animal kind, absent treated as 0.
    pub fn kills_of(&self, kind: AnimalKind) -> i64 {
        let value = match kind {
            AnimalKind::Elk => self.kills_elk,
            AnimalKind::Hawk => self.kills_hawk,
            AnimalKind::Snake => self.kills_snake,
            AnimalKind::Wolf => self.kills_wolf,
            AnimalKind::Bear => self.kills_bear,
            AnimalKind::Panther => self.kills_panther,
        };
        value.unwrap_or(0)
    }

    /// Total animal kills across all kinds.
    pub fn total_animal_kills(&self) -> i64 {
        AnimalKind::ALL.iter().map(|k| self.kills_of(*k)).sum()
    }

    /// Gold gathered; falls back to the legacy `gold` counter.
    pub fn gold_gathered(&self) -> i64 {
        self.gold_acquired.or(self.gold).unwrap_or(0)
    }
}
