//! HTTP API endpoints.
//!
//! Health and catalog info are public and never include prompt texts, since
//! those are the answers to the game. Store export/import does include them
//! and sits behind the admin Basic Auth middleware.

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::auth::{admin_auth_middleware, AuthConfig};
use crate::prompts::IMAGE_PROMPTS;
use crate::state::AppState;
use crate::store::{DocumentStore, StoreSnapshot};

/// All `/api` routes, with the admin ones guarded by `auth`
pub fn routes(auth: Arc<AuthConfig>) -> Router<Arc<AppState>> {
    let admin = Router::new()
        .route("/api/state/export", get(export_state))
        .route("/api/state/import", post(import_state))
        .layer(middleware::from_fn_with_state(auth, admin_auth_middleware));

    Router::new()
        .route("/api/health", get(health))
        .route("/api/prompts", get(prompts))
        .merge(admin)
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub rooms: usize,
    pub image_provider: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromptsResponse {
    pub count: usize,
}

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    match state.store.room_count().await {
        Ok(rooms) => Json(HealthResponse {
            status: "ok",
            rooms,
            image_provider: state.images.name().to_string(),
        })
        .into_response(),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response()
        }
    }
}

/// Export every room and message as JSON.
///
/// GET /api/state/export
pub async fn export_state(State(state): State<Arc<AppState>>) -> Json<StoreSnapshot> {
    Json(state.store.export().await)
}

/// Import a store snapshot.
///
/// POST /api/state/import
///
/// Replaces all current rooms and messages. Connected players receive the new
/// room state through their subscriptions.
pub async fn import_state(
    State(state): State<Arc<AppState>>,
    Json(snapshot): Json<StoreSnapshot>,
) -> Response {
    match state.store.import(snapshot).await {
        Ok(()) => (StatusCode::OK, "State imported successfully").into_response(),
        Err(e) => {
            tracing::error!("State import failed: {}", e);
            (StatusCode::BAD_REQUEST, format!("Import failed: {}", e)).into_response()
        }
    }
}

/// GET /api/prompts
pub async fn prompts() -> Json<PromptsResponse> {
    Json(PromptsResponse {
        count: IMAGE_PROMPTS.len(),
    })
}
