//! Per-connection state machine.
//!
//! ```text
//! CONNECTING ──register ok──▶ ACTIVE ──disconnect | socket error──▶ CLOSED
//!     │
//!     └──register failed──▶ (stays CONNECTING: socket open but inert)
//! ```
//!
//! The lifecycle is owned by the socket's connection task, so events for
//! one socket are handled one at a time. `CLOSED` is terminal: whichever of
//! disconnect or socket error arrives first deregisters the connection,
//! anything after that is ignored.

use std::fmt;
use std::sync::Arc;

use super::protocol_adapter::AdapterCore;
use super::request_correlator::{Dispatch, Origin};
use crate::domain::ConnectionId;
use crate::transport::{SocketId, TransportSocket};

/// State of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport reported the socket; not (or not successfully) registered.
    Connecting,
    /// Registered; messages are forwarded to the host.
    Active,
    /// Torn down.
    Closed,
}

/// Why an active connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The client or the adapter closed the socket.
    Disconnect,
    /// The transport reported an error on the socket.
    SocketError,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnect => f.write_str("disconnect"),
            Self::SocketError => f.write_str("socket error"),
        }
    }
}

/// Event handlers bound to one transport socket.
#[derive(Debug)]
pub struct ConnectionLifecycle {
    core: Arc<AdapterCore>,
    socket_id: SocketId,
    connection_id: Option<ConnectionId>,
    state: ConnectionState,
}

impl ConnectionLifecycle {
    pub(crate) fn new(core: Arc<AdapterCore>, socket: &TransportSocket) -> Self {
        Self {
            core,
            socket_id: socket.id().clone(),
            connection_id: None,
            state: ConnectionState::Connecting,
        }
    }

    /// Registers the connection. On failure the error is logged and the
    /// lifecycle stays `Connecting`, ignoring every later event.
    pub(crate) async fn open(&mut self, socket: &TransportSocket) -> ConnectionState {
        if self.state != ConnectionState::Connecting {
            return self.state;
        }
        match self.core.registry().register(socket).await {
            Ok(connection) => {
                tracing::info!(
                    socket_id = %self.socket_id,
                    connection_id = %connection.id(),
                    addresses = ?connection.remote_addresses(),
                    "connection accepted"
                );
                self.connection_id = Some(connection.id().clone());
                self.state = ConnectionState::Active;
            }
            Err(err) => {
                tracing::error!(socket_id = %self.socket_id, error = %err, "unable to declare new connection");
            }
        }
        self.state
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Socket this lifecycle is bound to.
    #[must_use]
    pub const fn socket_id(&self) -> &SocketId {
        &self.socket_id
    }

    /// Connection id, once registered.
    #[must_use]
    pub const fn connection_id(&self) -> Option<&ConnectionId> {
        self.connection_id.as_ref()
    }

    /// Handles an inbound event. Only the configured room event on an
    /// active connection is dispatched.
    pub async fn on_event(&self, event: &str, data: serde_json::Value) -> Option<Dispatch> {
        if self.state != ConnectionState::Active || event != self.core.room() {
            return None;
        }
        let origin = Origin {
            socket_id: self.socket_id.clone(),
            connection_id: self.connection_id.clone()?,
        };
        Some(self.core.correlator().dispatch(&origin, data).await)
    }

    /// Handles a disconnect. Returns `true` if this call closed the
    /// connection.
    pub async fn on_disconnect(&mut self) -> bool {
        self.close(CloseReason::Disconnect).await
    }

    /// Handles a transport error. Returns `true` if this call closed the
    /// connection.
    pub async fn on_error(&mut self, error: &(dyn fmt::Display + Sync)) -> bool {
        tracing::debug!(socket_id = %self.socket_id, error = %error, "socket error");
        self.close(CloseReason::SocketError).await
    }

    async fn close(&mut self, reason: CloseReason) -> bool {
        if self.state != ConnectionState::Active {
            return false;
        }
        self.state = ConnectionState::Closed;
        if let Some(connection_id) = &self.connection_id {
            self.core.registry().deregister(connection_id).await;
            tracing::info!(socket_id = %self.socket_id, %connection_id, %reason, "connection closed");
        }
        true
    }
}
