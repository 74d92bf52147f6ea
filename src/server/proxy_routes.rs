use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::info;

use crate::error::ProxyError;
use crate::server::server::AppState;
use crate::sources::upstream::{ScoreQuery, UpstreamResponse};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/authenticate", post(authenticate))
        .route("/api/validate_token", get(validate_token))
        .route("/api/user/{user_id}", get(user))
        .route("/api/user/{user_id}/scores", get(scores))
}

async fn authenticate(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ProxyError> {
    state.manager.acquire().await?;
    Ok(Json(json!({ "success": "Authenticated successfully" })))
}

async fn validate_token(State(state): State<AppState>) -> Response {
    match state.manager.validate().await {
        Ok(outcome) => {
            info!("token validation: {:?}", outcome);
            Json(json!({ "status": "success" })).into_response()
        }
        Err(e) => {
            let status = e.status();
            tracing::warn!(%status, error = %e, "token validation failed");
            (status, Json(json!({ "status": "error", "error": e.to_string() }))).into_response()
        }
    }
}

async fn user(State(state): State<AppState>, Path(user_id): Path<String>) -> Result<Response, ProxyError> {
    let response = state.manager.user(&user_id).await?;
    Ok(relay(&state, response))
}

async fn scores(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<ScoreQuery>,
) -> Result<Response, ProxyError> {
    let response = state.manager.best_scores(&user_id, &query).await?;
    Ok(relay(&state, response))
}

/// Upstream body verbatim; the upstream status only when configured to relay it.
fn relay(state: &AppState, response: UpstreamResponse) -> Response {
    if state.server.relay_upstream_status {
        (response.status, Json(response.body)).into_response()
    } else {
        (StatusCode::OK, Json(response.body)).into_response()
    }
}
