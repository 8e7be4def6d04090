//! Axum WebSocket upgrade handler.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;

use super::connection::run_connection;
use super::socket::Handshake;
use crate::app_state::AppState;

/// Upgrades the request and runs the socket loop, recording the peer
/// address and upgrade headers as the handshake.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let handshake = Handshake::new(peer.ip().to_string(), headers);
    let core = Arc::clone(&state.core);

    ws.on_upgrade(move |socket| run_connection(socket, handshake, core))
}
