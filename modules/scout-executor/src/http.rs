//! The executor's one real endpoint (spec.md §6): accept a scout id,
//! claim the run, dispatch it in the background, and answer immediately.
//! Grounded in the teacher's `rest/scout.rs` handlers — same "accept,
//! spawn, return" shape, adapted from a thread-per-run admin trigger to a
//! per-scout claim the dispatcher calls on a schedule.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::error::ExecutorError;
use crate::pipeline::execute_scout;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    #[serde(rename = "scoutId")]
    pub scout_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteQuery {
    #[serde(rename = "scoutId")]
    pub scout_id: Option<Uuid>,
}

/// Accepts `{scoutId}` as a JSON body (the dispatcher's shape) or as a
/// `scoutId` query parameter (spec.md §6).
async fn execute_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExecuteQuery>,
    body: Option<Json<ExecuteRequest>>,
) -> axum::response::Response {
    let scout_id = match body.map(|Json(b)| b.scout_id).or(query.scout_id) {
        Some(id) => id,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": "scoutId is required"})),
            )
                .into_response()
        }
    };

    match execute_scout(&state, scout_id).await {
        Ok((execution_id, title)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "scoutId": scout_id,
                "executionId": execution_id,
                "title": title,
            })),
        )
            .into_response(),
        Err(e) => {
            if !matches!(e, ExecutorError::AlreadyRunning(_) | ExecutorError::ScoutNotFound(_)) {
                tracing::error!(error = %e, %scout_id, "execution failed to start");
            }
            (&e).into_response()
        }
    }
}

async fn health() -> impl IntoResponse {
    "ok"
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/execute", post(execute_handler))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
}
