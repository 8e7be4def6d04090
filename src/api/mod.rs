//! HTTP surface: the WebSocket endpoint and the health route.

pub mod health;

use axum::Router;
use axum::routing::get;

use crate::app_state::AppState;
use crate::transport::handler::ws_handler;

/// Builds the router: WebSocket upgrades on `ws_path`, health on `/health`.
pub fn build_router(ws_path: &str) -> Router<AppState> {
    Router::new()
        .route(ws_path, get(ws_handler))
        .merge(health::routes())
}
