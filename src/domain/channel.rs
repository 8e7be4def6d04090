//! Channel commands issued by the host.
//!
//! These mirror the JSON shapes hosts already speak
//! (`{channels, payload}`, `{connectionId, channels, payload}`,
//! `{connectionId, channel}`) so they can be deserialized directly.

use serde::{Deserialize, Serialize};

use super::ConnectionId;

/// Publish a payload to every member of each channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastCommand {
    /// Target channels; each delivery is labelled with its channel name.
    pub channels: Vec<String>,
    /// Message body.
    pub payload: serde_json::Value,
}

/// Deliver a payload to a single connection, once per channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyCommand {
    /// Target connection.
    pub connection_id: ConnectionId,
    /// Channel labels to deliver under.
    pub channels: Vec<String>,
    /// Message body.
    pub payload: serde_json::Value,
}

/// Add a connection to, or remove it from, one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelCommand {
    /// Target connection.
    pub connection_id: ConnectionId,
    /// Channel name.
    pub channel: String,
}
