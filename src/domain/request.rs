//! Requests built from inbound client messages and their responses.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ConnectionContext;
use crate::error::ClientError;

/// Payload key a client may use to choose its own request id.
pub const REQUEST_ID_FIELD: &str = "requestId";

/// Identifier shared by a request and its response.
///
/// Doubles as the outbound event name the response is delivered on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Creates a new random id (UUID v4).
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
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

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One inbound message awaiting a response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    id: RequestId,
    payload: serde_json::Value,
    context: ConnectionContext,
}

impl Request {
    /// Builds a request from a raw client payload.
    ///
    /// The payload must be a JSON object. If it carries a `requestId`
    /// field, that field must be a non-empty string and becomes the
    /// request id; otherwise an id is generated.
    ///
    /// # Errors
    ///
    /// Returns a bad-request [`ClientError`] when the payload is not an
    /// object or its `requestId` is not a non-empty string.
    pub fn new(payload: serde_json::Value, context: ConnectionContext) -> Result<Self, ClientError> {
        let Some(object) = payload.as_object() else {
            return Err(ClientError::bad_request(
                "request payload must be a JSON object",
            ));
        };

        let id = match object.get(REQUEST_ID_FIELD) {
            None | Some(serde_json::Value::Null) => RequestId::generate(),
            Some(serde_json::Value::String(id)) if !id.is_empty() => RequestId::new(id.as_str()),
            Some(_) => {
                return Err(ClientError::bad_request(format!(
                    "{REQUEST_ID_FIELD} must be a non-empty string"
                )));
            }
        };

        Ok(Self {
            id,
            payload,
            context,
        })
    }

    /// Request id.
    #[must_use]
    pub const fn id(&self) -> &RequestId {
        &self.id
    }

    /// Raw message body.
    #[must_use]
    pub const fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Origin connection context.
    #[must_use]
    pub const fn context(&self) -> &ConnectionContext {
        &self.context
    }
}

/// Successful result of executing a request.
///
/// Sent to the client as `{"content": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Response body.
    pub content: serde_json::Value,
}

impl Response {
    /// Wraps a response body.
    #[must_use]
    pub const fn new(content: serde_json::Value) -> Self {
        Self { content }
    }
}
