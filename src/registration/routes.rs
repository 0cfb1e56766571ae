//! Read-only REST endpoints for inspecting registrations.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};

use super::session::{SessionPeek, SessionStore};
use crate::store::ProfileStore;

/// Shared state for registration routes.
#[derive(Clone)]
pub struct RegistrationRouteState {
    pub sessions: Arc<SessionStore>,
    pub store: Arc<dyn ProfileStore>,
}

fn not_found(message: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

/// GET /api/health
async fn health(State(state): State<RegistrationRouteState>) -> impl IntoResponse {
    let sessions = state.sessions.len().await;
    match state.store.count().await {
        Ok(profiles) => Json(serde_json::json!({
            "status": "ok",
            "service": "nutri-bot",
            "sessions": sessions,
            "profiles": profiles,
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach storage");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "degraded",
                    "service": "nutri-bot",
                    "sessions": sessions,
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// GET /api/users/{user_id}/profile
///
/// The stored profile, or 404 if the user never completed registration.
async fn get_profile(
    State(state): State<RegistrationRouteState>,
    Path(user_id): Path<i64>,
) -> impl IntoResponse {
    match state.store.get(user_id).await {
        Ok(Some(profile)) => Json(profile).into_response(),
        Ok(None) => not_found("No profile for this user"),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// GET /api/users/{user_id}/session
///
/// The live conversation state, 404 if there is none, or 409 while a turn
/// for this user is in flight.
async fn get_session(
    State(state): State<RegistrationRouteState>,
    Path(user_id): Path<i64>,
) -> impl IntoResponse {
    match state.sessions.peek(user_id).await {
        SessionPeek::Live(session) => Json(session).into_response(),
        SessionPeek::Vacant => not_found("No active session for this user"),
        SessionPeek::Busy => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "status": "busy",
                "user_id": user_id,
            })),
        )
            .into_response(),
    }
}

/// Build the registration REST routes.
pub fn registration_routes(state: RegistrationRouteState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/users/{user_id}/profile", get(get_profile))
        .route("/api/users/{user_id}/session", get(get_session))
        .with_state(state)
        .layer(cors)
}
