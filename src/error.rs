//! Gateway error types.
//!
//! Two families live here:
//!
//! - [`GatewayError`] covers adapter-side faults: configuration problems,
//!   transport bind failures, and connections that could not be declared.
//!   These are logged or returned to the host, never sent to a client.
//! - [`ClientError`] is the structured, client-visible error. It carries an
//!   [`ErrorKind`] with an HTTP-like status and a human-readable message,
//!   and is what crosses the wire when a request is rejected or fails.

use std::fmt;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

/// Structured JSON error payload sent to clients.
///
/// All client-visible errors follow this shape:
/// ```json
/// {
///   "error": {
///     "kind": "bad_request",
///     "status": 400,
///     "message": "request payload must be a JSON object"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with kind, status and message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    /// Error category.
    pub kind: ErrorKind,
    /// HTTP-like numeric status for the category.
    pub status: u16,
    /// Human-readable error message.
    pub message: String,
}

/// Category of a client-visible error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The client sent a structurally invalid message.
    BadRequest,
    /// The client is not authenticated.
    Unauthorized,
    /// The client is not allowed to perform the operation.
    Forbidden,
    /// The requested resource does not exist.
    NotFound,
    /// The host cannot serve the request right now.
    ServiceUnavailable,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// Returns the HTTP status code for this kind.
    #[must_use]
    pub const fn status_code(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the snake_case name used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BadRequest => "bad_request",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::ServiceUnavailable => "service_unavailable",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-visible error built by the adapter or by the host.
///
/// Hosts use the constructors ([`ClientError::bad_request`],
/// [`ClientError::internal`], ...) to fail a request or reject a
/// connection; the adapter serializes it with [`ClientError::to_payload`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ClientError {
    kind: ErrorKind,
    message: String,
}

impl ClientError {
    /// Creates an error of the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Structurally invalid client message.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    /// Client is not authenticated.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Client lacks the rights for the operation.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// Resource not found.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Host temporarily unable to serve.
    #[must_use]
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message)
    }

    /// Internal failure.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Builds the structured [`ErrorResponse`] for this error.
    #[must_use]
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: ErrorBody {
                kind: self.kind,
                status: self.kind.status_code().as_u16(),
                message: self.message.clone(),
            },
        }
    }

    /// Serializes the error into the JSON value sent over the wire.
    #[must_use]
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(self.to_response()).unwrap_or_else(|_| {
            serde_json::json!({
                "error": {
                    "kind": self.kind.as_str(),
                    "status": self.kind.status_code().as_u16(),
                    "message": self.message,
                }
            })
        })
    }
}

/// Adapter-side error enum.
///
/// | Variant             | Category              | Handling                         |
/// |---------------------|-----------------------|----------------------------------|
/// | `MissingPort`       | Configuration         | fatal, returned from `init`      |
/// | `InvalidConfig`     | Configuration         | fatal, returned from `init`      |
/// | `Bind`              | Transport             | logged, adapter degrades         |
/// | `Transport`         | Transport             | logged, adapter degrades         |
/// | `InvalidConnection` | Registration          | logged, connection abandoned     |
/// | `HostRejected`      | Registration          | logged, connection abandoned     |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The `port` setting is missing or zero.
    #[error("\"port\" attribute is required")]
    MissingPort,

    /// A configuration value could not be parsed or is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The listening endpoint could not be bound.
    #[error("unable to bind transport on {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: std::net::SocketAddr,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The transport failed after it was bound.
    #[error("transport failure: {0}")]
    Transport(#[from] std::io::Error),

    /// The connection's handshake data could not be turned into a connection.
    #[error("invalid connection: {0}")]
    InvalidConnection(String),

    /// The host refused to declare the connection.
    #[error("host rejected connection: {0}")]
    HostRejected(#[from] ClientError),
}

impl GatewayError {
    /// Returns `true` for errors that must stop initialization.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::MissingPort | Self::InvalidConfig(_))
    }
}
