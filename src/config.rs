//! Adapter configuration.
//!
//! Settings come either from environment variables (or a `.env` file via
//! `dotenvy`) or from a structured JSON value handed over by the host when
//! it initializes the adapter. Both paths go through the same validation:
//! `port` is required, everything else has a default.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use serde::Deserialize;

use crate::error::GatewayError;

/// Default event name clients use to send requests.
pub const DEFAULT_ROOM: &str = "kuzzle";

/// Default HTTP path of the WebSocket endpoint.
pub const DEFAULT_PATH: &str = "/ws";

/// Default per-socket outbound queue length.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// Top-level adapter configuration.
///
/// Validated once, then owned by the adapter for its whole life.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    /// TCP port of the listening endpoint. Never zero.
    pub port: u16,

    /// Inbound event name carrying client requests.
    pub room: String,

    /// Interface to bind to.
    pub bind_host: IpAddr,

    /// HTTP path of the WebSocket endpoint (starts with `/`).
    pub path: String,

    /// Capacity of each socket's outbound frame queue.
    pub outbound_capacity: usize,
}

/// Shape accepted by [`AdapterConfig::from_value`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawConfig {
    port: Option<u16>,
    room: Option<String>,
    bind_host: Option<IpAddr>,
    path: Option<String>,
    outbound_capacity: Option<usize>,
}

impl AdapterConfig {
    /// Creates a configuration for `port` with every other setting at its
    /// default.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MissingPort`] if `port` is zero.
    pub fn new(port: u16) -> Result<Self, GatewayError> {
        RawConfig {
            port: Some(port),
            ..RawConfig::default()
        }
        .validate()
    }

    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file, then
    /// reads `GATEWAY_PORT`, `GATEWAY_ROOM`, `GATEWAY_BIND_HOST`,
    /// `GATEWAY_PATH` and `GATEWAY_OUTBOUND_CAPACITY`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MissingPort`] if `GATEWAY_PORT` is unset or
    /// zero, and [`GatewayError::InvalidConfig`] if any set variable cannot
    /// be parsed.
    pub fn from_env() -> Result<Self, GatewayError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`AdapterConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        RawConfig {
            port: parse_var(&lookup, "GATEWAY_PORT")?,
            room: lookup("GATEWAY_ROOM"),
            bind_host: parse_var(&lookup, "GATEWAY_BIND_HOST")?,
            path: lookup("GATEWAY_PATH"),
            outbound_capacity: parse_var(&lookup, "GATEWAY_OUTBOUND_CAPACITY")?,
        }
        .validate()
    }

    /// Loads configuration from a structured value such as
    /// `{"port": 7512, "room": "kuzzle"}`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MissingPort`] if `port` is absent or zero,
    /// and [`GatewayError::InvalidConfig`] if the value is not an object,
    /// holds unknown keys, or holds values of the wrong type.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, GatewayError> {
        if value.is_null() {
            return Err(GatewayError::InvalidConfig(
                "a configuration parameter is required".to_string(),
            ));
        }
        let raw = RawConfig::deserialize(value)
            .map_err(|e| GatewayError::InvalidConfig(e.to_string()))?;
        raw.validate()
    }

    /// Socket address the listener binds to.
    #[must_use]
    pub const fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_host, self.port)
    }
}

impl RawConfig {
    fn validate(self) -> Result<AdapterConfig, GatewayError> {
        let port = match self.port {
            Some(0) | None => return Err(GatewayError::MissingPort),
            Some(port) => port,
        };

        let room = self.room.unwrap_or_else(|| DEFAULT_ROOM.to_string());
        if room.is_empty() {
            return Err(GatewayError::InvalidConfig(
                "room must not be empty".to_string(),
            ));
        }

        let path = self.path.unwrap_or_else(|| DEFAULT_PATH.to_string());
        if !path.starts_with('/') {
            return Err(GatewayError::InvalidConfig(format!(
                "path must start with '/': {path}"
            )));
        }

        let outbound_capacity = self.outbound_capacity.unwrap_or(DEFAULT_OUTBOUND_CAPACITY);
        if outbound_capacity == 0 {
            return Err(GatewayError::InvalidConfig(
                "outbound capacity must be positive".to_string(),
            ));
        }

        Ok(AdapterConfig {
            port,
            room,
            bind_host: self
                .bind_host
                .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            path,
            outbound_capacity,
        })
    }
}

/// Parses a variable as `T` if it is set; a set but unparsable value is an
/// error rather than a silent default.
fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, GatewayError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| GatewayError::InvalidConfig(format!("{key}: {e}")))
        })
        .transpose()
}
