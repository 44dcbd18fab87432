//! REST API endpoints.
//!
//! Axum-based HTTP API exposing the match queries and every aggregation
//! as thin handlers over the core: handlers bind filter parameters, open
//! a request scope and delegate. No aggregation logic lives here.

pub mod routes;
pub mod state;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::service::ServiceError;
use crate::store::StoreError;
use state::AppState;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::DuplicateMatchNumber(_) => ApiError::Conflict(err.to_string()),
            ServiceError::Invalid(_) => ApiError::BadRequest(err.to_string()),
            ServiceError::Store(StoreError::NotFound(id)) => ApiError::NotFound(id),
            ServiceError::Store(store_err) => ApiError::Internal(store_err.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ApiError::NotFound(id),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/matches",
            get(routes::matches::list_matches).post(routes::matches::create_completed),
        )
        .route(
            "/api/matches/scheduled",
            post(routes::matches::create_scheduled),
        )
        .route(
            "/api/matches/:id",
            get(routes::matches::get_match)
                .put(routes::matches::update_match)
                .delete(routes::matches::delete_match),
        )
        .route("/api/analytics/overview", get(routes::analytics::overview))
        .route("/api/analytics/activity", get(routes::analytics::activity))
        .route("/api/analytics/win-rate", get(routes::analytics::win_rate))
        .route(
            "/api/analytics/class-stats",
            get(routes::analytics::class_stats),
        )
        .route(
            "/api/analytics/class-selection",
            get(routes::analytics::class_selection),
        )
        .route(
            "/api/analytics/class-win-rates",
            get(routes::analytics::class_win_rates),
        )
        .route(
            "/api/analytics/match-length",
            get(routes::analytics::match_length),
        )
        .route(
            "/api/analytics/participant-activity",
            get(routes::analytics::participant_activity),
        )
        .route("/api/analytics/totals", get(routes::analytics::totals))
        .route(
            "/api/analytics/kills-distribution",
            get(routes::analytics::kills_distribution),
        )
        .route(
            "/api/analytics/top-hunters",
            get(routes::analytics::top_hunters),
        )
        .route(
            "/api/analytics/top-healers",
            get(routes::analytics::top_healers),
        )
        .route(
            "/api/analytics/rating-history",
            get(routes::analytics::rating_history),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
