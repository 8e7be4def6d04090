//! Inbound message → host request → response on the originating socket.
//!
//! Correlation needs no pending-request table: each submitted request gets
//! its own delivery task that owns the [`Origin`] it came from. When the
//! host completes, the task checks that the origin is still registered and
//! delivers the response under the request id, or drops it if the client
//! has gone away in the meantime.
//!
//! Host code never unwinds into the socket loop. A panic while building,
//! submitting or completing a request becomes an `internal` error for the
//! client.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::task::JoinHandle;

use crate::domain::{ConnectionContext, ConnectionId, ConnectionRegistry, Request, RequestId};
use crate::error::ClientError;
use crate::host::{Completion, Host};
use crate::transport::{SocketHub, SocketId};

/// Where a message came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// Socket the message arrived on.
    pub socket_id: SocketId,
    /// Connection registered for that socket.
    pub connection_id: ConnectionId,
}

/// Outcome of dispatching one message.
#[derive(Debug)]
pub enum Dispatch {
    /// No request could be built; nothing reached the host's executor.
    /// The error is sent to the socket under its own id.
    Rejected {
        /// Task delivering the error.
        delivery: JoinHandle<Delivery>,
    },
    /// The request was submitted to the host.
    Submitted {
        /// Id the response will be delivered under.
        request_id: RequestId,
        /// Task delivering the response.
        delivery: JoinHandle<Delivery>,
    },
}

/// Fate of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued on the originating socket.
    Delivered,
    /// The origin was no longer registered.
    Dropped,
}

/// Builds requests, submits them, and routes responses back.
pub struct RequestCorrelator {
    host: Arc<dyn Host>,
    registry: Arc<ConnectionRegistry>,
    hub: SocketHub,
}

impl RequestCorrelator {
    /// Creates a correlator.
    #[must_use]
    pub fn new(host: Arc<dyn Host>, registry: Arc<ConnectionRegistry>, hub: SocketHub) -> Self {
        Self {
            host,
            registry,
            hub,
        }
    }

    /// Handles one inbound payload from `origin`.
    ///
    /// The host sees the request before this returns, so awaiting each
    /// dispatch in arrival order preserves per-connection submission order.
    /// Responses may complete in any order; each carries its own id.
    pub async fn dispatch(&self, origin: &Origin, payload: serde_json::Value) -> Dispatch {
        let request = match self.build(origin, payload) {
            Ok(request) => request,
            Err(error) => return self.reject(origin, &error),
        };

        let request_id = request.id().clone();
        tracing::trace!(%request_id, connection_id = %origin.connection_id, "submitting request");
        let completion = self.submit(request);

        let delivery = tokio::spawn(deliver(
            Arc::clone(&self.registry),
            self.hub.clone(),
            origin.clone(),
            request_id.clone(),
            completion,
        ));
        Dispatch::Submitted {
            request_id,
            delivery,
        }
    }

    fn build(&self, origin: &Origin, payload: serde_json::Value) -> Result<Request, ClientError> {
        let context = ConnectionContext::new(origin.connection_id.clone());
        match panic::catch_unwind(AssertUnwindSafe(|| self.host.build_request(payload, context))) {
            Ok(Ok(request)) => Ok(request),
            Ok(Err(err)) => {
                tracing::debug!(socket_id = %origin.socket_id, error = %err, "malformed request");
                Err(ClientError::bad_request(err.message()))
            }
            Err(_) => {
                tracing::error!(socket_id = %origin.socket_id, "host panicked while building a request");
                Err(ClientError::internal("request construction panicked"))
            }
        }
    }

    /// Hands the request to the host and reduces whatever comes back to a
    /// completion. Callback hosts run their submit closure in here.
    fn submit(&self, request: Request) -> Completion {
        let submitted =
            panic::catch_unwind(AssertUnwindSafe(|| self.host.execute(request).into_completion()));
        submitted.unwrap_or_else(|_| {
            tracing::error!("host panicked while submitting a request");
            futures_util::future::ready(Err(ClientError::internal("request execution panicked")))
                .boxed()
        })
    }

    fn reject(&self, origin: &Origin, error: &ClientError) -> Dispatch {
        let hub = self.hub.clone();
        let socket_id = origin.socket_id.clone();
        let payload = error.to_payload();
        let delivery = tokio::spawn(async move {
            if hub.deliver(&socket_id, socket_id.as_str(), &payload).await {
                Delivery::Delivered
            } else {
                Delivery::Dropped
            }
        });
        Dispatch::Rejected { delivery }
    }
}

/// Awaits the host and delivers exactly one payload, success or error.
async fn deliver(
    registry: Arc<ConnectionRegistry>,
    hub: SocketHub,
    origin: Origin,
    request_id: RequestId,
    completion: Completion,
) -> Delivery {
    let result = AssertUnwindSafe(completion)
        .catch_unwind()
        .await
        .unwrap_or_else(|_| Err(ClientError::internal("request execution panicked")));

    let payload = match result {
        Ok(response) => serde_json::to_value(&response).unwrap_or_else(|e| {
            ClientError::internal(format!("response is not serializable: {e}")).to_payload()
        }),
        Err(err) => err.to_payload(),
    };

    let still_registered = registry.resolve_socket(&origin.socket_id).await.as_ref()
        == Some(&origin.connection_id);
    if still_registered && hub.deliver(&origin.socket_id, request_id.as_str(), &payload).await {
        Delivery::Delivered
    } else {
        Delivery::Dropped
    }
}

impl std::fmt::Debug for RequestCorrelator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCorrelator")
            .field("registry", &self.registry)
            .field("hub", &self.hub)
            .finish_non_exhaustive()
    }
}
