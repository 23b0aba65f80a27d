//! Router configuration.
//!
//! This module creates the main Axum router that combines all endpoints.

use axum::{http::StatusCode, response::Json, routing::get, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::handlers::{self, LOGIN_PATH, LOGOUT_PATH};
use crate::state::AppState;

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    let health = Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness_check));

    let spid = Router::new()
        .route("/", get(handlers::index))
        .route(LOGIN_PATH, get(handlers::spid_login))
        .route(LOGOUT_PATH, get(handlers::spid_logout))
        .with_state(state);

    Router::new()
        .merge(spid)
        .merge(health)
        .layer(TraceLayer::new_for_http())
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

/// Basic health check.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    })
}

/// Kubernetes liveness probe.
async fn liveness_check() -> StatusCode {
    StatusCode::OK
}
