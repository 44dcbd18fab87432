//! Filter parameters accepted by the planner and the aggregations.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::{DocId, MatchState, Participant, ResultFlag};

/// Default page size for match queries.
pub const DEFAULT_PAGE_LIMIT: usize = 20;

/// Default entry count for leaderboards.
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

/// Filters for match queries.
///
/// `start_date`/`end_date` are inclusive calendar dates applied against
/// the timestamp field of the filtered state (`played_at` for completed,
/// `scheduled_at` for scheduled). When `state` is not given, range and
/// category filters are silently ignored; they apply to different fields
/// for the two states, so there is nothing coherent to filter on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchFilters {
    pub state: Option<MatchState>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub match_number: Option<i64>,
    pub limit: Option<usize>,
    pub cursor: Option<DocId>,
}

impl MatchFilters {
    /// Effective page size.
    pub fn page_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_PAGE_LIMIT)
    }

    /// Builder method to set the state filter.
    pub fn with_state(mut self, state: MatchState) -> Self {
        self.state = Some(state);
        self
    }

    /// Builder method to set the category filter.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Builder method to set the inclusive date range.
    pub fn with_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }
}

/// Filters for aggregation pipelines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsFilters {
    pub category: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub player_name: Option<String>,
    pub team_format: Option<String>,
    pub limit: Option<usize>,
}

impl AnalyticsFilters {
    /// Deterministic serialization used to build cache keys.
    ///
    /// Field order is fixed here, never derived from map iteration, so
    /// identical filters always produce identical keys.
    pub fn canonical_key(&self) -> String {
        fn opt<T: std::fmt::Display>(value: &Option<T>) -> String {
            value.as_ref().map(|v| v.to_string()).unwrap_or_default()
        }
        format!(
            "category={}|startDate={}|endDate={}|playerName={}|teamFormat={}|limit={}",
            opt(&self.category),
            opt(&self.start_date),
            opt(&self.end_date),
            opt(&self.player_name),
            opt(&self.team_format),
            opt(&self.limit),
        )
    }

    /// The match-query filters implied by these aggregation filters:
    /// completed matches in the category/date window.
    pub fn to_match_filters(&self, limit: usize) -> MatchFilters {
        MatchFilters {
            state: Some(MatchState::Completed),
            start_date: self.start_date,
            end_date: self.end_date,
            category: self.category.clone(),
            match_number: None,
            limit: Some(limit),
            cursor: None,
        }
    }

    /// Builder method to set the category filter.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Builder method to set the inclusive date range.
    pub fn with_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    /// Builder method to set the player name.
    pub fn with_player(mut self, name: impl Into<String>) -> Self {
        self.player_name = Some(name.into());
        self
    }
}

/// A team split such as `2v2`, derived post-hoc from winner/loser
/// participant counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamFormat {
    pub winners: u32,
    pub losers: u32,
}

impl TeamFormat {
    /// Parse a `"{N}v{M}"` format string.
    pub fn parse(value: &str) -> Option<Self> {
        static FORMAT: OnceLock<Regex> = OnceLock::new();
        let re = FORMAT.get_or_init(|| Regex::new(r"^(\d+)v(\d+)$").expect("valid regex"));
        let caps = re.captures(value.trim())?;
        Some(Self {
            winners: caps[1].parse().ok()?,
            losers: caps[2].parse().ok()?,
        })
    }

    /// Derive the format of a match from its participants' outcome flags.
    pub fn of_participants(players: &[Participant]) -> Self {
        let winners = players
            .iter()
            .filter(|p| p.result_flag == ResultFlag::Winner)
            .count() as u32;
        let losers = players
            .iter()
            .filter(|p| p.result_flag == ResultFlag::Loser)
            .count() as u32;
        Self { winners, losers }
    }
}

impl std::fmt::Display for TeamFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.winners, self.losers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocId;

    #[test]
    fn test_canonical_key_stable_order() {
        let filters = AnalyticsFilters {
            category: Some("1v1".into()),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 2, 1),
            player_name: Some("Alice".into()),
            team_format: None,
            limit: Some(10),
        };
        assert_eq!(
            filters.canonical_key(),
            "category=1v1|startDate=2024-01-01|endDate=2024-02-01|playerName=Alice|teamFormat=|limit=10"
        );
    }

    #[test]
    fn test_canonical_key_identical_filters_identical_keys() {
        let a = AnalyticsFilters::default().with_category("2v2");
        let b = AnalyticsFilters::default().with_category("2v2");
        assert_eq!(a.canonical_key(), b.canonical_key());
        let c = AnalyticsFilters::default().with_category("3v3");
        assert_ne!(a.canonical_key(), c.canonical_key());
    }

    #[test]
    fn test_page_limit_default() {
        assert_eq!(MatchFilters::default().page_limit(), DEFAULT_PAGE_LIMIT);
        let filters = MatchFilters {
            limit: Some(5),
            ..MatchFilters::default()
        };
        assert_eq!(filters.page_limit(), 5);
    }

    #[test]
    fn test_team_format_parse() {
        assert_eq!(
            TeamFormat::parse("2v2"),
            Some(TeamFormat {
                winners: 2,
                losers: 2
            })
        );
        assert_eq!(
            TeamFormat::parse(" 1v3 "),
            Some(TeamFormat {
                winners: 1,
                losers: 3
            })
        );
        assert_eq!(TeamFormat::parse("ffa"), None);
        assert_eq!(TeamFormat::parse("2v"), None);
        assert_eq!(TeamFormat::parse(""), None);
    }

    #[test]
    fn test_team_format_of_participants() {
        let players = vec![
            Participant::new(DocId::from("m"), "a", 0, ResultFlag::Winner),
            Participant::new(DocId::from("m"), "b", 1, ResultFlag::Winner),
            Participant::new(DocId::from("m"), "c", 2, ResultFlag::Loser),
            Participant::new(DocId::from("m"), "d", 3, ResultFlag::Drawer),
        ];
        let format = TeamFormat::of_participants(&players);
        assert_eq!(format.to_string(), "2v1");
    }

    #[test]
    fn test_to_match_filters_completed_only() {
        let filters = AnalyticsFilters::default()
            .with_category("1v1")
            .with_range(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            );
        let match_filters = filters.to_match_filters(100);
        assert_eq!(match_filters.state, Some(MatchState::Completed));
        assert_eq!(match_filters.category.as_deref(), Some("1v1"));
        assert_eq!(match_filters.page_limit(), 100);
    }
}
