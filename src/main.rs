//! socket-gateway server entry point.
//!
//! Starts the adapter in front of a loopback host that answers every
//! request with its own payload. Useful for exercising clients without a
//! real router behind the gateway.

use std::sync::Arc;

use anyhow::Context;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tracing_subscriber::EnvFilter;

use socket_gateway::config::AdapterConfig;
use socket_gateway::domain::{Connection, ConnectionContext, Request, Response};
use socket_gateway::error::ClientError;
use socket_gateway::host::{Execution, Host};
use socket_gateway::service::ProtocolAdapter;

/// Host that accepts every connection and echoes request payloads.
#[derive(Debug)]
struct LoopbackHost;

impl Host for LoopbackHost {
    fn new_connection(&self, connection: &Connection) -> BoxFuture<'static, Result<(), ClientError>> {
        tracing::debug!(connection_id = %connection.id(), "loopback: connection announced");
        futures_util::future::ready(Ok(())).boxed()
    }

    fn execute(&self, request: Request) -> Execution {
        Execution::ready(Ok(Response::new(request.payload().clone())))
    }

    fn remove_connection(&self, context: &ConnectionContext) -> Result<(), ClientError> {
        tracing::debug!(connection_id = %context.connection_id, "loopback: connection removed");
        Ok(())
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AdapterConfig::from_env().context("invalid adapter configuration")?;
    tracing::info!(port = config.port, room = %config.room, "starting socket-gateway");

    let adapter = ProtocolAdapter::init(config, Arc::new(LoopbackHost)).await;
    if adapter.is_degraded() {
        anyhow::bail!("transport unavailable, nothing to serve");
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("shutdown requested");
    adapter.shutdown().await;

    Ok(())
}
