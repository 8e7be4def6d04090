//! Wire frame: the event envelope carried by every WebSocket text message.
//!
//! ```json
//! { "event": "kuzzle", "data": { "controller": "server", "action": "now" } }
//! ```
//!
//! Inbound, `event` selects the listener. Outbound, it is the request id,
//! the socket id, or the channel name the payload is delivered under.

use serde::{Deserialize, Serialize};

/// Event envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Event label.
    pub event: String,
    /// Event body. Missing bodies decode as `null`.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Frame {
    /// Creates a frame.
    #[must_use]
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Decodes a text message.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the text is not a frame.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Encodes an event without building an owned frame first.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the payload cannot be serialized.
    pub fn encode(event: &str, data: &serde_json::Value) -> Result<String, serde_json::Error> {
        #[derive(Serialize)]
        struct Borrowed<'a> {
            event: &'a str,
            data: &'a serde_json::Value,
        }
        serde_json::to_string(&Borrowed { event, data })
    }
}
