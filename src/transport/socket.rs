//! Transport-level socket identity and handshake data.

use std::fmt;

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

/// Identifier of one transport socket. Unique for the life of the hub.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SocketId(String);

impl SocketId {
    /// Creates a new random socket id (UUID v4, simple form).
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Wraps an existing identifier string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the transport observed when the client connected.
#[derive(Debug, Clone)]
pub struct Handshake {
    /// Observed peer address.
    pub address: String,
    /// Upgrade request headers.
    pub headers: HeaderMap,
}

impl Handshake {
    /// Creates a handshake record.
    #[must_use]
    pub fn new(address: impl Into<String>, headers: HeaderMap) -> Self {
        Self {
            address: address.into(),
            headers,
        }
    }
}

/// A socket attached to the [`super::SocketHub`].
#[derive(Debug, Clone)]
pub struct TransportSocket {
    id: SocketId,
    handshake: Handshake,
}

impl TransportSocket {
    pub(crate) const fn new(id: SocketId, handshake: Handshake) -> Self {
        Self { id, handshake }
    }

    /// Socket id.
    #[must_use]
    pub const fn id(&self) -> &SocketId {
        &self.id
    }

    /// Handshake data captured at connection time.
    #[must_use]
    pub const fn handshake(&self) -> &Handshake {
        &self.handshake
    }
}
