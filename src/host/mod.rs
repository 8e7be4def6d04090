//! Host collaborator contract.
//!
//! The host owns request execution and the authoritative list of logical
//! connections. The adapter talks to it only through [`Host`]: announce a
//! connection, build and execute requests, announce teardown.

pub mod execution;
#[cfg(test)]
pub(crate) mod mock;

use futures_util::future::BoxFuture;

use crate::domain::{Connection, ConnectionContext, Request};
use crate::error::ClientError;

pub use execution::{Completion, Execution, ExecutionResult, Reply};

/// Host-side router the adapter forwards to.
///
/// Connection ids are always assigned by the adapter (see
/// [`crate::domain::ConnectionId`]); the host only accepts or rejects them.
pub trait Host: Send + Sync + 'static {
    /// Announces a new logical connection.
    ///
    /// May complete immediately (`futures_util::future::ready(..).boxed()`)
    /// or after async work. An `Err` abandons the connection.
    fn new_connection(&self, connection: &Connection) -> BoxFuture<'static, Result<(), ClientError>>;

    /// Builds a request from a raw client payload.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] (normally bad-request) when the payload is
    /// structurally invalid; the client receives it and nothing is executed.
    fn build_request(
        &self,
        payload: serde_json::Value,
        context: ConnectionContext,
    ) -> Result<Request, ClientError> {
        Request::new(payload, context)
    }

    /// Executes a request, as a future or through a callback.
    fn execute(&self, request: Request) -> Execution;

    /// Announces that a connection ended.
    ///
    /// # Errors
    ///
    /// Failures are logged by the adapter and otherwise ignored.
    fn remove_connection(&self, context: &ConnectionContext) -> Result<(), ClientError>;
}
