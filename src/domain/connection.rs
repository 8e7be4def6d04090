//! Logical client connections.
//!
//! A [`Connection`] is the adapter's durable view of one client session,
//! built once from the transport handshake: the remote address chain and
//! the request headers. Its identifier is derived from the transport
//! socket id, so one socket maps to exactly one connection.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::transport::{Handshake, SocketId};

/// Protocol family tag attached to every connection and request context.
pub const PROTOCOL: &str = "websocket";

/// Header carrying the proxy forwarding chain.
pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Identifier of a logical connection.
///
/// Assigned by the adapter, never by the host: it is the transport socket
/// id of the connection's socket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
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

impl From<&SocketId> for ConnectionId {
    fn from(socket_id: &SocketId) -> Self {
        Self(socket_id.as_str().to_string())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Correlation data identifying a connection to the host.
///
/// Sent along with every request and with the removal notice; the host
/// never gets a socket handle, only this pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionContext {
    /// Logical connection id.
    pub connection_id: ConnectionId,
    /// Protocol family tag, always [`PROTOCOL`].
    pub protocol: String,
}

impl ConnectionContext {
    /// Builds the context for a connection of this adapter's protocol.
    #[must_use]
    pub fn new(connection_id: ConnectionId) -> Self {
        Self {
            connection_id,
            protocol: PROTOCOL.to_string(),
        }
    }
}

/// One logical client session.
///
/// Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    id: ConnectionId,
    protocol: &'static str,
    remote_addresses: Vec<String>,
    headers: BTreeMap<String, String>,
    connected_at: DateTime<Utc>,
}

impl Connection {
    /// Builds a connection for the socket `socket_id` from its handshake.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidConnection`] if the forwarding chain
    /// contains an empty entry or a header value is not valid UTF-8.
    pub fn from_handshake(socket_id: &SocketId, handshake: &Handshake) -> Result<Self, GatewayError> {
        let remote_addresses = address_chain(handshake)?;
        let headers = handshake
            .headers
            .iter()
            .map(|(name, value)| {
                value
                    .to_str()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
                    .map_err(|_| {
                        GatewayError::InvalidConnection(format!(
                            "header {name} is not a valid string"
                        ))
                    })
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(Self {
            id: ConnectionId::from(socket_id),
            protocol: PROTOCOL,
            remote_addresses,
            headers,
            connected_at: Utc::now(),
        })
    }

    /// Logical connection id.
    #[must_use]
    pub const fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Protocol family tag.
    #[must_use]
    pub const fn protocol(&self) -> &'static str {
        self.protocol
    }

    /// Client addresses, most trusted last.
    #[must_use]
    pub fn remote_addresses(&self) -> &[String] {
        &self.remote_addresses
    }

    /// Handshake headers, keyed by lowercase name.
    #[must_use]
    pub const fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// When the transport reported the connection.
    #[must_use]
    pub const fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Correlation context to hand to the host.
    #[must_use]
    pub fn context(&self) -> ConnectionContext {
        ConnectionContext::new(self.id.clone())
    }
}

/// Builds the remote address chain: the forwarding header entries in
/// order, followed by the transport's observed peer address.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidConnection`] if the forwarding header
/// is not a string or holds an empty entry.
pub fn address_chain(handshake: &Handshake) -> Result<Vec<String>, GatewayError> {
    let mut chain = Vec::new();
    if let Some(forwarded) = handshake.headers.get(FORWARDED_FOR) {
        let forwarded = forwarded.to_str().map_err(|_| {
            GatewayError::InvalidConnection(format!("{FORWARDED_FOR} is not a valid string"))
        })?;
        for entry in forwarded.split(',').map(str::trim) {
            if entry.is_empty() {
                return Err(GatewayError::InvalidConnection(format!(
                    "empty entry in {FORWARDED_FOR}: {forwarded:?}"
                )));
            }
            chain.push(entry.to_string());
        }
    }
    chain.push(handshake.address.clone());
    Ok(chain)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue};

    use super::*;

    fn handshake(forwarded: Option<&'static str>) -> Handshake {
        let mut headers = HeaderMap::new();
        headers.insert("x-foo", HeaderValue::from_static("bar"));
        if let Some(value) = forwarded {
            headers.insert(FORWARDED_FOR, HeaderValue::from_static(value));
        }
        Handshake::new("ip", headers)
    }

    #[test]
    fn forwarded_chain_precedes_peer_address() {
        let Ok(chain) = address_chain(&handshake(Some("1.1.1.1,2.2.2.2"))) else {
            panic!("valid chain");
        };
        assert_eq!(chain, vec!["1.1.1.1", "2.2.2.2", "ip"]);
    }

    #[test]
    fn forwarded_entries_are_trimmed() {
        let Ok(chain) = address_chain(&handshake(Some(" 1.1.1.1 ,  2.2.2.2"))) else {
            panic!("valid chain");
        };
        assert_eq!(chain, vec!["1.1.1.1", "2.2.2.2", "ip"]);
    }

    #[test]
    fn no_forwarding_header_yields_peer_only() {
        let Ok(chain) = address_chain(&handshake(None)) else {
            panic!("valid chain");
        };
        assert_eq!(chain, vec!["ip"]);
    }

    #[test]
    fn empty_forwarded_entry_fails() {
        let result = address_chain(&handshake(Some("1.1.1.1,,2.2.2.2")));
        assert!(matches!(result, Err(GatewayError::InvalidConnection(_))));
    }

    #[test]
    fn connection_captures_headers_and_id() {
        let socket_id = SocketId::new("sock-1");
        let Ok(conn) = Connection::from_handshake(&socket_id, &handshake(Some("1.1.1.1,2.2.2.2")))
        else {
            panic!("valid connection");
        };
        assert_eq!(conn.id().as_str(), "sock-1");
        assert_eq!(conn.protocol(), PROTOCOL);
        assert_eq!(conn.remote_addresses(), ["1.1.1.1", "2.2.2.2", "ip"]);
        assert_eq!(conn.headers().get("x-foo").map(String::as_str), Some("bar"));
        assert_eq!(
            conn.headers().get(FORWARDED_FOR).map(String::as_str),
            Some("1.1.1.1,2.2.2.2")
        );
    }

    #[test]
    fn non_utf8_header_fails_construction() {
        let mut headers = HeaderMap::new();
        let Ok(value) = HeaderValue::from_bytes(&[0xff, 0xfe]) else {
            panic!("opaque header bytes are accepted by HeaderValue");
        };
        headers.insert("x-raw", value);
        let result = Connection::from_handshake(&SocketId::new("s"), &Handshake::new("ip", headers));
        assert!(matches!(result, Err(GatewayError::InvalidConnection(_))));
    }

    #[test]
    fn context_serializes_camel_case() {
        let ctx = ConnectionContext::new(ConnectionId::new("c1"));
        let json = serde_json::to_value(&ctx).unwrap_or_default();
        assert_eq!(json, serde_json::json!({"connectionId": "c1", "protocol": "websocket"}));
    }
}
