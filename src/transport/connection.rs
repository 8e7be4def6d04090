//! Per-socket read/write loop.
//!
//! Attaches the socket to the hub, hands it to the adapter, then pumps
//! inbound frames into the connection's lifecycle and drains the outbox
//! onto the socket until either side goes away. Teardown runs however the
//! loop ends, a panic included.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{FutureExt, SinkExt, StreamExt};

use super::frame::Frame;
use super::hub::{Outbound, Outbox};
use super::socket::Handshake;
use crate::service::{AdapterCore, ConnectionLifecycle};

/// Runs one WebSocket connection to completion.
pub async fn run_connection(socket: WebSocket, handshake: Handshake, core: Arc<AdapterCore>) {
    let (transport, mut outbox) = core.hub().attach(handshake).await;
    let mut lifecycle = core.accept(&transport).await;

    let pumped = AssertUnwindSafe(pump(socket, &mut outbox, &mut lifecycle))
        .catch_unwind()
        .await;
    if pumped.is_err() {
        tracing::error!(socket_id = %transport.id(), "socket loop panicked");
    }

    lifecycle.on_disconnect().await;
    core.hub().detach(transport.id()).await;
    tracing::debug!(socket_id = %transport.id(), state = ?lifecycle.state(), "socket loop finished");
}

async fn pump(socket: WebSocket, outbox: &mut Outbox, lifecycle: &mut ConnectionLifecycle) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => match Frame::decode(&text) {
                        Ok(frame) => {
                            let _ = lifecycle.on_event(&frame.event, frame.data).await;
                        }
                        Err(e) => {
                            tracing::debug!(socket_id = %lifecycle.socket_id(), error = %e, "ignoring undecodable frame");
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        lifecycle.on_disconnect().await;
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        lifecycle.on_error(&e).await;
                        break;
                    }
                }
            }
            item = outbox.recv() => {
                match item {
                    Some(Outbound::Text(text)) => {
                        if let Err(e) = ws_tx.send(Message::text(text.as_str())).await {
                            lifecycle.on_error(&e).await;
                            break;
                        }
                    }
                    Some(Outbound::Close) | None => {
                        let _ = ws_tx.send(Message::Close(None)).await;
                        lifecycle.on_disconnect().await;
                        break;
                    }
                }
            }
        }
    }
}
