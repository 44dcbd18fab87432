//! Stored per-player aggregate records.
//!
//! Profiles are keyed by lower-cased player name and hold one record per
//! match category. They back the single-player win/loss fast path and
//! seed the rating-history series.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::document::{str_field, Document};

/// Starting rating score for players with no stored record.
pub const STARTING_SCORE: f64 = 1000.0;

/// Category key used when a match carries no category label.
pub const DEFAULT_CATEGORY: &str = "default";

/// Per-category aggregate record for one player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    /// Current rating score
    pub score: f64,
    pub wins: i64,
    pub losses: i64,
    pub draws: i64,
    /// Total matches recorded in this category
    pub games: i64,
}

/// Stored per-player aggregates, one record per category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerProfile {
    /// Lower-cased, trimmed player name
    pub name: String,
    pub categories: HashMap<String, CategoryRecord>,
}

impl PlayerProfile {
    /// Create an empty profile for a player.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: normalize_player_name(&name.into()),
            categories: HashMap::new(),
        }
    }

    /// Convert an untyped stored document. Pure and total: a malformed
    /// categories map degrades to empty.
    pub fn from_document(doc: &Document) -> Self {
        let mut categories = HashMap::new();
        if let Some(Value::Object(map)) = doc.get("categories") {
            for (category, value) in map {
                let record = serde_json::from_value(value.clone()).unwrap_or_default();
                categories.insert(category.clone(), record);
            }
        }
        Self {
            name: str_field(doc, "name"),
            categories,
        }
    }

    /// Serialize back to a stored document.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert("name".into(), Value::from(self.name.clone()));
        let categories: serde_json::Map<String, Value> = self
            .categories
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::to_value(v).unwrap_or(Value::Null)))
            .collect();
        doc.insert("categories".into(), Value::Object(categories));
        doc
    }

    /// Current score for a category, or the starting score.
    pub fn score(&self, category: &str) -> f64 {
        self.categories
            .get(category)
            .map(|r| r.score)
            .unwrap_or(STARTING_SCORE)
    }

    /// Mutable category record, created at the starting score if absent.
    pub fn category_mut(&mut self, category: &str) -> &mut CategoryRecord {
        self.categories
            .entry(category.to_string())
            .or_insert_with(|| CategoryRecord {
                score: STARTING_SCORE,
                ..CategoryRecord::default()
            })
    }
}

/// Canonical player-name form used for profile keys and cross-match
/// identity: whitespace-collapsed and lower-cased.
pub fn normalize_player_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
