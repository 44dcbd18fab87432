use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::models::{DocId, MatchFilters, MatchState, MatchWithPlayers};
use crate::query::loader::{find_with_participants, MatchPageWithPlayers};
use crate::service;

/// Match list query parameters. Accepted in camelCase or snake_case.
#[derive(Debug, Deserialize)]
pub struct ListMatchesParams {
    pub state: Option<MatchState>,
    #[serde(alias = "startDate")]
    pub start_date: Option<NaiveDate>,
    #[serde(alias = "endDate")]
    pub end_date: Option<NaiveDate>,
    pub category: Option<String>,
    #[serde(alias = "matchNumber")]
    pub match_number: Option<i64>,
    pub limit: Option<usize>,
    pub cursor: Option<String>,
}

impl ListMatchesParams {
    fn into_filters(self) -> MatchFilters {
        MatchFilters {
            state: self.state,
            start_date: self.start_date,
            end_date: self.end_date,
            category: self.category,
            match_number: self.match_number,
            limit: self.limit,
            cursor: self.cursor.map(DocId::from),
        }
    }
}

pub async fn list_matches(
    State(state): State<AppState>,
    Query(params): Query<ListMatchesParams>,
) -> Result<Json<MatchPageWithPlayers>, ApiError> {
    let page = find_with_participants(state.store.as_ref(), &params.into_filters()).await?;
    Ok(Json(page))
}

pub async fn get_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MatchWithPlayers>, ApiError> {
    let record = service::get_match(state.store.as_ref(), &DocId::from(id.as_str())).await?;
    match record {
        Some(found) => Ok(Json(found)),
        None => Err(ApiError::NotFound(id)),
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

pub async fn create_completed(
    State(state): State<AppState>,
    Json(data): Json<service::CreateCompletedMatch>,
) -> Result<Json<CreatedResponse>, ApiError> {
    let id =
        service::create_completed_match(state.store.as_ref(), &state.invalidation, data).await?;
    Ok(Json(CreatedResponse {
        id: id.as_str().to_string(),
    }))
}

pub async fn create_scheduled(
    State(state): State<AppState>,
    Json(data): Json<service::CreateScheduledMatch>,
) -> Result<Json<CreatedResponse>, ApiError> {
    let id =
        service::create_scheduled_match(state.store.as_ref(), &state.invalidation, data).await?;
    Ok(Json(CreatedResponse {
        id: id.as_str().to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

pub async fn update_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<service::UpdateMatch>,
) -> Result<Json<StatusResponse>, ApiError> {
    service::update_match(
        state.store.as_ref(),
        &state.invalidation,
        &DocId::from(id.as_str()),
        update,
    )
    .await?;
    Ok(Json(StatusResponse { status: "updated" }))
}

pub async fn delete_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    service::delete_match(
        state.store.as_ref(),
        &state.invalidation,
        &DocId::from(id.as_str()),
    )
    .await?;
    Ok(Json(StatusResponse { status: "deleted" }))
}

#[cfg(test)]
mod tests {
    use crate::api::{build_router, state::AppState};
    use crate::cache::{spawn_invalidation_listener, ResultCache};
    use crate::store::MemoryStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::util::ServiceExt;

    fn test_state() -> AppState {
        let cache = Arc::new(ResultCache::with_defaults());
        AppState {
            store: Arc::new(MemoryStore::new()),
            cache: cache.clone(),
            invalidation: spawn_invalidation_listener(cache),
        }
    }

    async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    async fn post_json(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    fn completed_match_body(number: i64) -> Value {
        json!({
            "match_number": number,
            "played_at": "2024-01-05T12:00:00Z",
            "duration_seconds": 1800,
            "map_name": "Glacier",
            "category": "1v1",
            "players": [
                {"name": "Alice", "position_index": 0, "result_flag": "winner"},
                {"name": "Bob", "position_index": 1, "result_flag": "loser"},
            ],
        })
    }

    #[tokio::test]
    async fn test_create_and_list_matches() {
        let state = test_state();
        let app = build_router(state.clone());

        let (status, created) =
            post_json(app.clone(), "/api/matches", completed_match_body(1)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(created["id"].is_string());

        let (status, json) = get_json(app, "/api/matches?state=completed").await;
        assert_eq!(status, StatusCode::OK);
        let matches = json["matches"].as_array().unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0]["match_number"], 1);
        assert_eq!(matches[0]["players"].as_array().unwrap().len(), 2);
        assert_eq!(json["has_more"], false);
    }

    #[tokio::test]
    async fn test_camel_case_params_accepted() {
        let state = test_state();
        let app = build_router(state);

        post_json(app.clone(), "/api/matches", completed_match_body(9)).await;

        let (status, json) = get_json(app, "/api/matches?matchNumber=9").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["matches"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_match_number_conflicts() {
        let state = test_state();
        let app = build_router(state);

        let (status, _) = post_json(app.clone(), "/api/matches", completed_match_body(5)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = post_json(app, "/api/matches", completed_match_body(5)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_get_match_and_missing_404() {
        let state = test_state();
        let app = build_router(state);

        let (_, created) = post_json(app.clone(), "/api/matches", completed_match_body(3)).await;
        let id = created["id"].as_str().unwrap();

        let (status, json) = get_json(app.clone(), &format!("/api/matches/{}", id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["match_number"], 3);

        let (status, _) = get_json(app, "/api/matches/does-not-exist").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_then_list_excludes() {
        let state = test_state();
        let app = build_router(state);

        let (_, created) = post_json(app.clone(), "/api/matches", completed_match_body(4)).await;
        let id = created["id"].as_str().unwrap();

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/matches/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let (_, json) = get_json(app, "/api/matches").await;
        assert!(json["matches"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_scheduled_match() {
        let state = test_state();
        let app = build_router(state);

        let (status, created) = post_json(
            app.clone(),
            "/api/matches/scheduled",
            json!({"scheduled_at": "2024-03-01T18:00:00Z", "team_size": "2v2"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(created["id"].is_string());

        let (_, json) = get_json(app, "/api/matches?state=scheduled").await;
        assert_eq!(json["matches"].as_array().unwrap().len(), 1);
        assert_eq!(json["matches"][0]["team_size"], "2v2");
    }

    #[tokio::test]
    async fn test_invalid_body_rejected() {
        let state = test_state();
        let app = build_router(state);

        let mut body = completed_match_body(2);
        body["players"] = json!([]);
        let (status, _) = post_json(app, "/api/matches", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
