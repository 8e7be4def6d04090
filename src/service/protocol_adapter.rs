//! Adapter orchestration: listener, wiring, and the host-facing API.
//!
//! [`ProtocolAdapter::init`] binds the listening endpoint and starts the
//! HTTP/WebSocket server. If the endpoint cannot be bound, or the server
//! later fails, the adapter switches to degraded mode: it stays usable
//! from the host's side, but every operation returns `false` without
//! touching the transport.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::lifecycle::ConnectionLifecycle;
use super::{Availability, ChannelBroker, RequestCorrelator};
use crate::api;
use crate::app_state::AppState;
use crate::config::AdapterConfig;
use crate::domain::{
    BroadcastCommand, ChannelCommand, Connection, ConnectionId, ConnectionRegistry, NotifyCommand,
};
use crate::error::GatewayError;
use crate::host::Host;
use crate::transport::{SocketHub, TransportSocket};

/// Components shared by every connection task and the host-facing API.
#[derive(Debug)]
pub struct AdapterCore {
    room: String,
    hub: SocketHub,
    registry: Arc<ConnectionRegistry>,
    broker: ChannelBroker,
    correlator: RequestCorrelator,
    availability: Availability,
}

impl AdapterCore {
    /// Wires registry, broker and correlator around a fresh hub.
    #[must_use]
    pub fn new(config: &AdapterConfig, host: Arc<dyn Host>, availability: Availability) -> Self {
        let hub = SocketHub::new(config.outbound_capacity);
        let registry = Arc::new(ConnectionRegistry::new(Arc::clone(&host)));
        let broker = ChannelBroker::new(hub.clone(), Arc::clone(&registry), availability.clone());
        let correlator = RequestCorrelator::new(host, Arc::clone(&registry), hub.clone());
        Self {
            room: config.room.clone(),
            hub,
            registry,
            broker,
            correlator,
            availability,
        }
    }

    /// Binds handlers to a freshly attached socket and registers it.
    pub async fn accept(self: &Arc<Self>, socket: &TransportSocket) -> ConnectionLifecycle {
        let mut lifecycle = ConnectionLifecycle::new(Arc::clone(self), socket);
        lifecycle.open(socket).await;
        lifecycle
    }

    /// Inbound event name carrying requests.
    #[must_use]
    pub fn room(&self) -> &str {
        &self.room
    }

    /// Transport hub.
    #[must_use]
    pub const fn hub(&self) -> &SocketHub {
        &self.hub
    }

    /// Connection registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Channel broker.
    #[must_use]
    pub const fn broker(&self) -> &ChannelBroker {
        &self.broker
    }

    /// Request correlator.
    #[must_use]
    pub const fn correlator(&self) -> &RequestCorrelator {
        &self.correlator
    }

    /// Degraded-mode switch.
    #[must_use]
    pub const fn availability(&self) -> &Availability {
        &self.availability
    }
}

/// The protocol adapter as seen by the host.
#[derive(Debug)]
pub struct ProtocolAdapter {
    config: AdapterConfig,
    core: Arc<AdapterCore>,
    local_addr: Option<SocketAddr>,
    shutdown: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<()>>,
}

impl ProtocolAdapter {
    /// Validates a structured configuration, then initializes the adapter.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MissingPort`] or
    /// [`GatewayError::InvalidConfig`]; transport problems never fail
    /// initialization, they degrade the adapter instead.
    pub async fn from_value(
        config: &serde_json::Value,
        host: Arc<dyn Host>,
    ) -> Result<Self, GatewayError> {
        let config = AdapterConfig::from_value(config)?;
        Ok(Self::init(config, host).await)
    }

    /// Binds the listening endpoint and starts serving.
    ///
    /// Dropping the adapter stops the listener.
    pub async fn init(config: AdapterConfig, host: Arc<dyn Host>) -> Self {
        let addr = config.listen_addr();
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(source) => {
                let err = GatewayError::Bind { addr, source };
                tracing::error!(error = %err, "transport unavailable, adapter degraded");
                return Self::degraded(config, host);
            }
        };

        let availability = Availability::available();
        let core = Arc::new(AdapterCore::new(&config, host, availability.clone()));
        let local_addr = listener.local_addr().ok();
        let app = build_app(&config, AppState::new(Arc::clone(&core)));
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let server = tokio::spawn(async move {
            let result = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await;
            if let Err(e) = result {
                let err = GatewayError::Transport(e);
                tracing::error!(error = %err, "unable to connect, adapter degraded");
                availability.degrade();
            }
        });

        tracing::info!(addr = ?local_addr, room = %config.room, path = %config.path, "adapter listening");
        Self {
            config,
            core,
            local_addr,
            shutdown: Some(shutdown_tx),
            server: Some(server),
        }
    }

    /// Adapter that never got a transport.
    fn degraded(config: AdapterConfig, host: Arc<dyn Host>) -> Self {
        let core = Arc::new(AdapterCore::new(&config, host, Availability::degraded()));
        Self {
            config,
            core,
            local_addr: None,
            shutdown: None,
            server: None,
        }
    }

    /// Publishes a payload to every listed channel.
    pub async fn broadcast(&self, command: &BroadcastCommand) -> bool {
        self.core.broker().broadcast(command).await
    }

    /// Delivers a payload to one connection, once per channel.
    pub async fn notify(&self, command: &NotifyCommand) -> bool {
        self.core.broker().notify(command).await
    }

    /// Adds a connection to a channel.
    pub async fn join_channel(&self, command: &ChannelCommand) -> bool {
        self.core.broker().join_channel(command).await
    }

    /// Removes a connection from a channel.
    pub async fn leave_channel(&self, command: &ChannelCommand) -> bool {
        self.core.broker().leave_channel(command).await
    }

    /// Force-closes a tracked connection's socket. Teardown then follows the
    /// normal disconnect path.
    pub async fn disconnect(&self, connection_id: &ConnectionId) -> bool {
        if self.is_degraded() {
            return false;
        }
        match self.core.registry().resolve(connection_id).await {
            Some(socket_id) => self.core.hub().close(&socket_id).await,
            None => false,
        }
    }

    /// Returns `true` once the transport is unavailable.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.core.availability().is_available()
    }

    /// Address actually bound, if any.
    #[must_use]
    pub const fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Inbound event name carrying requests.
    #[must_use]
    pub fn room(&self) -> &str {
        self.core.room()
    }

    /// Number of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.core.registry().len().await
    }

    /// Snapshot of a registered connection: addresses, headers, and when it
    /// connected.
    pub async fn connection(&self, connection_id: &ConnectionId) -> Option<Connection> {
        self.core.registry().connection(connection_id).await
    }

    /// Stops accepting, closes every socket, and waits for the server task.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.core.hub().close_all().await;
        if let Some(server) = self.server.take() {
            let _ = server.await;
        }
        tracing::info!("adapter stopped");
    }
}

/// HTTP application: socket endpoint, health route, tracing and CORS.
fn build_app(config: &AdapterConfig, state: AppState) -> Router {
    api::build_router(&config.path)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use serde_json::json;

    use super::*;
    use crate::host::mock::{RecordingHost, ReplyMode};

    fn localhost_config(port: u16) -> AdapterConfig {
        let Ok(mut config) = AdapterConfig::new(port) else {
            panic!("valid config");
        };
        config.bind_host = IpAddr::V4(Ipv4Addr::LOCALHOST);
        config
    }

    #[tokio::test]
    async fn missing_port_fails_init() {
        let host = RecordingHost::new(ReplyMode::EchoFuture);
        let result = ProtocolAdapter::from_value(&json!({"room": "x"}), host).await;
        assert!(matches!(result, Err(GatewayError::MissingPort)));
    }

    #[tokio::test]
    async fn occupied_port_degrades() {
        let Ok(blocker) = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await else {
            panic!("ephemeral bind");
        };
        let Ok(port) = blocker.local_addr().map(|a| a.port()) else {
            panic!("bound address");
        };
        let host = RecordingHost::new(ReplyMode::EchoFuture);
        let adapter = ProtocolAdapter::init(localhost_config(port), host).await;

        assert!(adapter.is_degraded());
        assert!(adapter.local_addr().is_none());

        let cmd = ChannelCommand {
            connection_id: ConnectionId::new("any"),
            channel: "c".to_string(),
        };
        assert!(!adapter.join_channel(&cmd).await);
        assert!(!adapter.leave_channel(&cmd).await);
        assert!(
            !adapter
                .broadcast(&BroadcastCommand {
                    channels: vec!["c".to_string()],
                    payload: json!(1),
                })
                .await
        );
        assert!(
            !adapter
                .notify(&NotifyCommand {
                    connection_id: ConnectionId::new("any"),
                    channels: vec!["c".to_string()],
                    payload: json!(1),
                })
                .await
        );
        assert!(!adapter.disconnect(&ConnectionId::new("any")).await);
        drop(blocker);
    }

    #[tokio::test]
    async fn degraded_disconnect_leaves_sockets_alone() {
        let host = RecordingHost::new(ReplyMode::EchoFuture);
        let adapter = ProtocolAdapter::degraded(localhost_config(1), host);
        let (socket, mut rx) = adapter
            .core
            .hub()
            .attach(crate::transport::Handshake::new("ip", axum::http::HeaderMap::new()))
            .await;
        let _ = adapter.core.accept(&socket).await;

        let Some(connection_id) = adapter.core.registry().resolve_socket(socket.id()).await else {
            panic!("registration works without a listener");
        };
        assert!(!adapter.disconnect(&connection_id).await);
        assert!(rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn disconnect_closes_tracked_socket() {
        let host = RecordingHost::new(ReplyMode::EchoFuture);
        let core = Arc::new(AdapterCore::new(
            &localhost_config(1),
            host as Arc<dyn Host>,
            Availability::available(),
        ));
        let adapter = ProtocolAdapter {
            config: localhost_config(1),
            core: Arc::clone(&core),
            local_addr: None,
            shutdown: None,
            server: None,
        };
        let (socket, mut rx) = core
            .hub()
            .attach(crate::transport::Handshake::new("ip", axum::http::HeaderMap::new()))
            .await;
        let lifecycle = core.accept(&socket).await;
        let Some(connection_id) = lifecycle.connection_id().cloned() else {
            panic!("accepted connection has an id");
        };

        let Some(connection) = adapter.connection(&connection_id).await else {
            panic!("tracked connection is visible to the host");
        };
        assert_eq!(connection.remote_addresses(), ["ip"]);

        assert!(adapter.disconnect(&connection_id).await);
        assert_eq!(rx.try_recv(), Some(crate::transport::Outbound::Close));
        assert!(!adapter.disconnect(&ConnectionId::new("unknown")).await);
    }

    #[tokio::test]
    async fn bound_adapter_reports_address_and_stops() {
        let host = RecordingHost::new(ReplyMode::EchoFuture);
        let Ok(scratch) = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await else {
            panic!("ephemeral bind");
        };
        let Ok(port) = scratch.local_addr().map(|a| a.port()) else {
            panic!("bound address");
        };
        drop(scratch);

        let adapter = ProtocolAdapter::init(localhost_config(port), host).await;
        assert!(!adapter.is_degraded());
        assert_eq!(adapter.local_addr().map(|a| a.port()), Some(port));
        assert_eq!(adapter.room(), "kuzzle");
        assert_eq!(adapter.connection_count().await, 0);
        adapter.shutdown().await;
    }
}
