//! Recording host used by unit tests.
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::Notify;

use super::{Execution, ExecutionResult, Host};
use crate::domain::{Connection, ConnectionContext, Request, Response};
use crate::error::ClientError;

/// How the mock answers `execute`.
#[derive(Debug, Clone)]
pub(crate) enum ReplyMode {
    /// Future resolving to `{"echo": payload}`.
    EchoFuture,
    /// Callback answering `{"echo": payload}` from a spawned task.
    EchoCallback,
    /// Future failing with the given error.
    Fail(ClientError),
    /// Future that waits on the gate before echoing.
    Gated(Arc<Notify>),
    /// Callback that drops its reply.
    DropReply,
    /// Future that sleeps for the payload's `delayMs` before echoing.
    Delayed,
    /// Future that panics when polled.
    PanicInFuture,
    /// `execute` itself panics.
    PanicOnExecute,
    /// `build_request` panics.
    PanicOnBuild,
}

#[derive(Debug)]
pub(crate) struct RecordingHost {
    mode: ReplyMode,
    reject_connections: AtomicBool,
    panic_on_connect: AtomicBool,
    announced: Mutex<Vec<Connection>>,
    executed: Mutex<Vec<Request>>,
    removed: Mutex<Vec<ConnectionContext>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn echo(request: &Request) -> Response {
    Response::new(serde_json::json!({ "echo": request.payload() }))
}

fn explode(request: &Request) -> ExecutionResult {
    panic!("host failed while completing {}", request.id());
}

impl RecordingHost {
    pub(crate) fn new(mode: ReplyMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            reject_connections: AtomicBool::new(false),
            panic_on_connect: AtomicBool::new(false),
            announced: Mutex::new(Vec::new()),
            executed: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn reject_connections(&self) {
        self.reject_connections.store(true, Ordering::SeqCst);
    }

    pub(crate) fn panic_on_connect(&self) {
        self.panic_on_connect.store(true, Ordering::SeqCst);
    }

    pub(crate) fn announced(&self) -> Vec<Connection> {
        lock(&self.announced).clone()
    }

    pub(crate) fn executed(&self) -> Vec<Request> {
        lock(&self.executed).clone()
    }

    pub(crate) fn removed(&self) -> Vec<ConnectionContext> {
        lock(&self.removed).clone()
    }
}

impl Host for RecordingHost {
    fn new_connection(&self, connection: &Connection) -> BoxFuture<'static, Result<(), ClientError>> {
        if self.panic_on_connect.load(Ordering::SeqCst) {
            panic!("host failed while announcing {}", connection.id());
        }
        let result = if self.reject_connections.load(Ordering::SeqCst) {
            Err(ClientError::service_unavailable("test"))
        } else {
            lock(&self.announced).push(connection.clone());
            Ok(())
        };
        futures_util::future::ready(result).boxed()
    }

    fn build_request(
        &self,
        payload: serde_json::Value,
        context: ConnectionContext,
    ) -> Result<Request, ClientError> {
        if matches!(self.mode, ReplyMode::PanicOnBuild) {
            panic!("host failed while building a request");
        }
        Request::new(payload, context)
    }

    fn execute(&self, request: Request) -> Execution {
        lock(&self.executed).push(request.clone());
        match &self.mode {
            ReplyMode::EchoFuture => Execution::future(async move { Ok(echo(&request)) }),
            ReplyMode::EchoCallback => Execution::callback(move |reply| {
                tokio::spawn(async move {
                    reply.send(Ok(echo(&request)));
                });
            }),
            ReplyMode::Fail(err) => Execution::ready(Err(err.clone())),
            ReplyMode::Gated(gate) => {
                let gate = Arc::clone(gate);
                Execution::future(async move {
                    gate.notified().await;
                    Ok(echo(&request))
                })
            }
            ReplyMode::DropReply => Execution::callback(drop),
            ReplyMode::Delayed => {
                let delay = request.payload()["delayMs"].as_u64().unwrap_or(0);
                Execution::future(async move {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    Ok(echo(&request))
                })
            }
            ReplyMode::PanicInFuture => Execution::future(async move { explode(&request) }),
            ReplyMode::PanicOnExecute => panic!("host failed while executing {}", request.id()),
            ReplyMode::PanicOnBuild => Execution::ready(Ok(echo(&request))),
        }
    }

    fn remove_connection(&self, context: &ConnectionContext) -> Result<(), ClientError> {
        lock(&self.removed).push(context.clone());
        Ok(())
    }
}
