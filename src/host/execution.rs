//! Uniform completion contract for request execution.
//!
//! Hosts answer a request in one of two shapes:
//!
//! - **future**: [`Execution::future`] wraps an async computation that
//!   resolves to the response;
//! - **callback**: [`Execution::callback`] hands the host a [`Reply`]
//!   it calls exactly once, whenever and from wherever it likes.
//!
//! The correlator never sees either shape. It converts every execution into
//! a [`Completion`] with [`Execution::into_completion`] and awaits that. A
//! callback host that drops its [`Reply`] without answering still produces
//! exactly one (error) result.

use std::fmt;
use std::future::Future;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::oneshot;

use crate::domain::Response;
use crate::error::ClientError;

/// Result of executing one request.
pub type ExecutionResult = Result<Response, ClientError>;

/// The single awaited form every execution is reduced to.
pub type Completion = BoxFuture<'static, ExecutionResult>;

/// Boxed callback body of a callback-style execution.
type CallbackFn = Box<dyn FnOnce(Reply) + Send + 'static>;

/// Continuation shape chosen by the host for one request.
pub enum Execution {
    /// The host returned a future.
    Future(Completion),
    /// The host will answer through a [`Reply`].
    Callback(CallbackFn),
}

impl Execution {
    /// Future-style execution.
    pub fn future<F>(future: F) -> Self
    where
        F: Future<Output = ExecutionResult> + Send + 'static,
    {
        Self::Future(future.boxed())
    }

    /// Callback-style execution. `submit` runs synchronously when the
    /// request is submitted and must eventually call [`Reply::send`].
    pub fn callback<F>(submit: F) -> Self
    where
        F: FnOnce(Reply) + Send + 'static,
    {
        Self::Callback(Box::new(submit))
    }

    /// Already-known result.
    #[must_use]
    pub fn ready(result: ExecutionResult) -> Self {
        Self::Future(futures_util::future::ready(result).boxed())
    }

    /// Reduces either shape to a [`Completion`].
    ///
    /// For callbacks, the submit closure runs before this returns, so the
    /// host observes submissions in call order.
    #[must_use]
    pub fn into_completion(self) -> Completion {
        match self {
            Self::Future(future) => future,
            Self::Callback(submit) => {
                let (tx, rx) = oneshot::channel();
                submit(Reply(tx));
                async move {
                    rx.await.unwrap_or_else(|_| {
                        Err(ClientError::internal(
                            "request was dropped without a response",
                        ))
                    })
                }
                .boxed()
            }
        }
    }
}

impl fmt::Debug for Execution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Future(_) => f.write_str("Execution::Future(..)"),
            Self::Callback(_) => f.write_str("Execution::Callback(..)"),
        }
    }
}

/// One-shot answer handle given to callback-style hosts.
#[derive(Debug)]
pub struct Reply(oneshot::Sender<ExecutionResult>);

impl Reply {
    /// Delivers the result. Consumes the handle, so it can only be sent once.
    pub fn send(self, result: ExecutionResult) {
        // The receiver only disappears if the adapter is shutting down.
        let _ = self.0.send(result);
    }

    /// Shorthand for a successful response.
    pub fn ok(self, content: serde_json::Value) {
        self.send(Ok(Response::new(content)));
    }

    /// Shorthand for a failure.
    pub fn fail(self, error: ClientError) {
        self.send(Err(error));
    }
}
