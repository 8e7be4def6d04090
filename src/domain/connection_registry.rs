//! Socket ↔ connection bookkeeping.
//!
//! [`ConnectionRegistry`] holds the two-way mapping between transport
//! socket ids and logical connections, and mediates registration and
//! teardown with the host. Only the adapter mutates it; the broker and the
//! correlator only resolve through it.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::RwLock;

use super::{Connection, ConnectionContext, ConnectionId};
use crate::error::{ClientError, GatewayError};
use crate::host::Host;
use crate::transport::{SocketId, TransportSocket};

#[derive(Debug)]
struct Registered {
    socket_id: SocketId,
    connection: Connection,
}

#[derive(Debug, Default)]
struct Entries {
    by_socket: HashMap<SocketId, ConnectionId>,
    by_connection: HashMap<ConnectionId, Registered>,
}

/// Registry of active logical connections.
///
/// Both directions of the mapping live behind one lock so they can never
/// disagree.
pub struct ConnectionRegistry {
    host: Arc<dyn Host>,
    entries: RwLock<Entries>,
}

impl ConnectionRegistry {
    /// Creates an empty registry announcing to `host`.
    #[must_use]
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self {
            host,
            entries: RwLock::new(Entries::default()),
        }
    }

    /// Builds a connection from the socket's handshake, announces it to the
    /// host, and records it.
    ///
    /// Nothing is recorded unless every step succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidConnection`] if the handshake cannot
    /// be turned into a connection, and [`GatewayError::HostRejected`] if
    /// the host refuses it or panics while announcing it.
    pub async fn register(&self, socket: &TransportSocket) -> Result<Connection, GatewayError> {
        let connection = Connection::from_handshake(socket.id(), socket.handshake())?;
        AssertUnwindSafe(async { self.host.new_connection(&connection).await })
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(ClientError::internal("connection announcement panicked")))?;

        let mut entries = self.entries.write().await;
        entries
            .by_socket
            .insert(socket.id().clone(), connection.id().clone());
        entries.by_connection.insert(
            connection.id().clone(),
            Registered {
                socket_id: socket.id().clone(),
                connection: connection.clone(),
            },
        );
        Ok(connection)
    }

    /// Removes the connection if present and tells the host it ended.
    ///
    /// Removing an unknown id leaves the registry untouched; the host is
    /// still notified. Host failures and panics are logged, never returned.
    pub async fn deregister(&self, connection_id: &ConnectionId) -> Option<Connection> {
        let removed = {
            let mut entries = self.entries.write().await;
            let removed = entries.by_connection.remove(connection_id);
            if let Some(registered) = &removed {
                entries.by_socket.remove(&registered.socket_id);
            }
            removed
        };

        let context = ConnectionContext::new(connection_id.clone());
        match panic::catch_unwind(AssertUnwindSafe(|| self.host.remove_connection(&context))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(%connection_id, error = %e, "host failed to remove connection");
            }
            Err(_) => {
                tracing::error!(%connection_id, "host panicked while removing connection");
            }
        }

        removed.map(|registered| registered.connection)
    }

    /// Socket currently backing `connection_id`, if registered.
    pub async fn resolve(&self, connection_id: &ConnectionId) -> Option<SocketId> {
        self.entries
            .read()
            .await
            .by_connection
            .get(connection_id)
            .map(|registered| registered.socket_id.clone())
    }

    /// Connection registered for `socket_id`, if any.
    pub async fn resolve_socket(&self, socket_id: &SocketId) -> Option<ConnectionId> {
        self.entries.read().await.by_socket.get(socket_id).cloned()
    }

    /// Snapshot of a registered connection.
    pub async fn connection(&self, connection_id: &ConnectionId) -> Option<Connection> {
        self.entries
            .read()
            .await
            .by_connection
            .get(connection_id)
            .map(|registered| registered.connection.clone())
    }

    /// Number of registered connections.
    pub async fn len(&self) -> usize {
        self.entries.read().await.by_connection.len()
    }

    /// Returns `true` if no connection is registered.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.by_connection.is_empty()
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue};

    use super::*;
    use crate::host::mock::{RecordingHost, ReplyMode};
    use crate::transport::{Handshake, SocketHub};

    async fn socket(hub: &SocketHub) -> TransportSocket {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("1.1.1.1,2.2.2.2"));
        headers.insert("x-foo", HeaderValue::from_static("bar"));
        hub.attach(Handshake::new("ip", headers)).await.0
    }

    #[tokio::test]
    async fn register_announces_and_records() {
        let host = RecordingHost::new(ReplyMode::EchoFuture);
        let registry = ConnectionRegistry::new(Arc::clone(&host) as Arc<dyn Host>);
        let hub = SocketHub::new(4);
        let sock = socket(&hub).await;

        let Ok(conn) = registry.register(&sock).await else {
            panic!("registration should succeed");
        };
        assert_eq!(conn.remote_addresses(), ["1.1.1.1", "2.2.2.2", "ip"]);
        assert_eq!(host.announced().len(), 1);
        assert_eq!(registry.resolve(conn.id()).await.as_ref(), Some(sock.id()));
        assert_eq!(registry.resolve_socket(sock.id()).await.as_ref(), Some(conn.id()));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn rejected_connection_is_not_recorded() {
        let host = RecordingHost::new(ReplyMode::EchoFuture);
        host.reject_connections();
        let registry = ConnectionRegistry::new(Arc::clone(&host) as Arc<dyn Host>);
        let hub = SocketHub::new(4);
        let sock = socket(&hub).await;

        let result = registry.register(&sock).await;
        assert!(matches!(result, Err(GatewayError::HostRejected(_))));
        assert!(registry.is_empty().await);
        assert!(registry.resolve_socket(sock.id()).await.is_none());
    }

    #[tokio::test]
    async fn panicking_announcement_is_contained() {
        let host = RecordingHost::new(ReplyMode::EchoFuture);
        host.panic_on_connect();
        let registry = ConnectionRegistry::new(Arc::clone(&host) as Arc<dyn Host>);
        let hub = SocketHub::new(4);
        let sock = socket(&hub).await;

        let result = registry.register(&sock).await;
        let Err(GatewayError::HostRejected(err)) = result else {
            panic!("panicking host must reject the connection");
        };
        assert_eq!(err.kind(), crate::error::ErrorKind::Internal);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn invalid_handshake_is_not_announced() {
        let host = RecordingHost::new(ReplyMode::EchoFuture);
        let registry = ConnectionRegistry::new(Arc::clone(&host) as Arc<dyn Host>);
        let hub = SocketHub::new(4);
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(","));
        let (sock, _rx) = hub.attach(Handshake::new("ip", headers)).await;

        let result = registry.register(&sock).await;
        assert!(matches!(result, Err(GatewayError::InvalidConnection(_))));
        assert!(host.announced().is_empty());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn deregister_is_idempotent_on_registry() {
        let host = RecordingHost::new(ReplyMode::EchoFuture);
        let registry = ConnectionRegistry::new(Arc::clone(&host) as Arc<dyn Host>);
        let hub = SocketHub::new(4);
        let sock = socket(&hub).await;
        let Ok(conn) = registry.register(&sock).await else {
            panic!("registration should succeed");
        };

        assert!(registry.deregister(conn.id()).await.is_some());
        assert!(registry.deregister(conn.id()).await.is_none());
        assert!(registry.is_empty().await);
        assert!(registry.resolve_socket(sock.id()).await.is_none());

        let removed = host.removed();
        assert_eq!(removed.len(), 2);
        assert!(removed.iter().all(|ctx| &ctx.connection_id == conn.id()));
    }

    #[tokio::test]
    async fn deregister_only_removes_its_own_entry() {
        let host = RecordingHost::new(ReplyMode::EchoFuture);
        let registry = ConnectionRegistry::new(host);
        let hub = SocketHub::new(4);
        let first = socket(&hub).await;
        let second = socket(&hub).await;
        let (Ok(a), Ok(b)) = (registry.register(&first).await, registry.register(&second).await)
        else {
            panic!("registrations should succeed");
        };

        registry.deregister(a.id()).await;
        assert!(registry.connection(a.id()).await.is_none());
        assert!(registry.connection(b.id()).await.is_some());
        assert_eq!(registry.len().await, 1);
    }
}
