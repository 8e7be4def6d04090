//! Health endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` while the transport is usable, `degraded` otherwise.
    pub status: String,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    /// Crate version.
    pub version: String,
    /// Registered connections.
    pub connections: usize,
}

/// `GET /health`: adapter health and connection count.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let status = if state.core.availability().is_available() {
        "healthy"
    } else {
        "degraded"
    };
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: status.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            connections: state.core.registry().len().await,
        }),
    )
}

/// Routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}
