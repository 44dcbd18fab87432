use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::analytics;
use crate::api::state::AppState;
use crate::api::ApiError;
use crate::cache::RequestScope;
use crate::models::AnalyticsFilters;

/// Aggregation query parameters. Accepted in camelCase or snake_case.
#[derive(Debug, Deserialize)]
pub struct AnalyticsParams {
    pub category: Option<String>,
    #[serde(alias = "startDate")]
    pub start_date: Option<NaiveDate>,
    #[serde(alias = "endDate")]
    pub end_date: Option<NaiveDate>,
    #[serde(alias = "playerName", alias = "player")]
    pub player_name: Option<String>,
    #[serde(alias = "teamFormat")]
    pub team_format: Option<String>,
    pub limit: Option<usize>,
}

impl AnalyticsParams {
    fn into_filters(self) -> AnalyticsFilters {
        AnalyticsFilters {
            category: self.category,
            start_date: self.start_date,
            end_date: self.end_date,
            player_name: self.player_name,
            team_format: self.team_format,
            limit: self.limit,
        }
    }
}

pub async fn activity(
    State(state): State<AppState>,
    Query(params): Query<AnalyticsParams>,
) -> Json<Vec<analytics::ActivityPoint>> {
    let ctx = state.analytics();
    let filters = params.into_filters();
    Json(analytics::activity_by_day(&ctx, &RequestScope::new(), &filters).await)
}

pub async fn win_rate(
    State(state): State<AppState>,
    Query(params): Query<AnalyticsParams>,
) -> Json<analytics::WinLossDraw> {
    let ctx = state.analytics();
    let filters = params.into_filters();
    Json(analytics::win_loss_draw(&ctx, &RequestScope::new(), &filters).await)
}

pub async fn class_stats(
    State(state): State<AppState>,
    Query(params): Query<AnalyticsParams>,
) -> Json<Vec<analytics::ClassStats>> {
    let ctx = state.analytics();
    let filters = params.into_filters();
    Json(analytics::class_stats(&ctx, &RequestScope::new(), &filters).await)
}

pub async fn class_selection(
    State(state): State<AppState>,
    Query(params): Query<AnalyticsParams>,
) -> Json<Vec<analytics::ClassCount>> {
    let ctx = state.analytics();
    let filters = params.into_filters();
    Json(analytics::class_selection(&ctx, &RequestScope::new(), &filters).await)
}

pub async fn class_win_rates(
    State(state): State<AppState>,
    Query(params): Query<AnalyticsParams>,
) -> Json<Vec<analytics::ClassWinRate>> {
    let ctx = state.analytics();
    let filters = params.into_filters();
    Json(analytics::class_win_rates(&ctx, &RequestScope::new(), &filters).await)
}

pub async fn match_length(
    State(state): State<AppState>,
    Query(params): Query<AnalyticsParams>,
) -> Json<Vec<analytics::MatchLengthPoint>> {
    let ctx = state.analytics();
    let filters = params.into_filters();
    Json(analytics::match_length_by_day(&ctx, &RequestScope::new(), &filters).await)
}

pub async fn participant_activity(
    State(state): State<AppState>,
    Query(params): Query<AnalyticsParams>,
) -> Json<Vec<analytics::ParticipantActivityPoint>> {
    let ctx = state.analytics();
    let filters = params.into_filters();
    Json(analytics::participant_activity_by_month(&ctx, &RequestScope::new(), &filters).await)
}

pub async fn totals(
    State(state): State<AppState>,
    Query(params): Query<AnalyticsParams>,
) -> Json<analytics::AggregateTotals> {
    let ctx = state.analytics();
    let filters = params.into_filters();
    Json(analytics::aggregate_totals(&ctx, &RequestScope::new(), &filters).await)
}

pub async fn kills_distribution(
    State(state): State<AppState>,
    Query(params): Query<AnalyticsParams>,
) -> Json<Vec<analytics::AnimalKillsSlice>> {
    let ctx = state.analytics();
    let filters = params.into_filters();
    Json(analytics::animal_kills_distribution(&ctx, &RequestScope::new(), &filters).await)
}

pub async fn top_hunters(
    State(state): State<AppState>,
    Query(params): Query<AnalyticsParams>,
) -> Json<Vec<analytics::TopHunterEntry>> {
    let ctx = state.analytics();
    let filters = params.into_filters();
    Json(analytics::top_hunters(&ctx, &RequestScope::new(), &filters).await)
}

pub async fn top_healers(
    State(state): State<AppState>,
    Query(params): Query<AnalyticsParams>,
) -> Json<Vec<analytics::TopHealerEntry>> {
    let ctx = state.analytics();
    let filters = params.into_filters();
    Json(analytics::top_healers(&ctx, &RequestScope::new(), &filters).await)
}

pub async fn rating_history(
    State(state): State<AppState>,
    Query(params): Query<AnalyticsParams>,
) -> Result<Json<Vec<analytics::RatingPoint>>, ApiError> {
    if params.player_name.is_none() {
        return Err(ApiError::BadRequest("player_name is required".into()));
    }
    if params.category.is_none() {
        return Err(ApiError::BadRequest("category is required".into()));
    }
    let ctx = state.analytics();
    let filters = params.into_filters();
    Ok(Json(
        analytics::rating_history(&ctx, &RequestScope::new(), &filters).await,
    ))
}

#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    pub total_matches: u32,
    pub record: analytics::WinLossDraw,
    pub totals: analytics::AggregateTotals,
}

/// Combined dashboard overview. All aggregations share one request
/// scope, so the underlying match set is fetched once per request.
pub async fn overview(
    State(state): State<AppState>,
    Query(params): Query<AnalyticsParams>,
) -> Json<OverviewResponse> {
    let ctx = state.analytics();
    let filters = params.into_filters();
    let scope = RequestScope::new();

    let record = analytics::win_loss_draw(&ctx, &scope, &filters).await;
    let totals = analytics::aggregate_totals(&ctx, &scope, &filters).await;

    Json(OverviewResponse {
        total_matches: totals.total_matches,
        record,
        totals,
    })
}
