// SPDX-License-Identifier: MIT
//! The remote-call executor.
//!
//! [`RemoteExecutor::execute`] takes a zero-argument async operation and
//! returns a [`CallHandle`]: a replay-latest view of the call that starts
//! at `InProgress` and settles on exactly one terminal [`CallResult`].
//! The operation runs on its own task, so dropping the handle never
//! cancels it and clones of the handle all observe the same outcome.
//!
//! Classification side effects:
//! - host-unreachable → schedule a fresh connectivity probe
//! - HTTP 401 → invoke the owner-supplied unauthorized handler
//!
//! Both run detached so the caller's terminal result is never delayed by
//! a probe timeout or an in-flight logout. No failure class escapes the
//! executor as an error type; every raise maps to `Error(Remote(…))`.

use super::{
    message_for_status, CallError, CallResult, Envelope, GENERIC_REMOTE_MSG, MISMATCHED_DATA_MSG,
    NETWORK_UNREACHABLE_MSG,
};
use crate::connectivity::ConnectivityMonitor;
use crate::transport::TransportError;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, warn};

/// Session-invalidation capability supplied by the executor's owner.
///
/// Invoked on every 401. Implementations must coalesce concurrent
/// invocations: many in-flight calls can fail with 401 at once and only
/// the first may do real work (see [`crate::single_flight::SingleFlight`]).
#[async_trait]
pub trait UnauthorizedHandler: Send + Sync {
    async fn on_unauthorized(&self);
}

/// Turns arbitrary async remote operations into uniform result streams.
///
/// Cheaply cloneable; clones share the connectivity monitor and the
/// unauthorized handler.
#[derive(Clone)]
pub struct RemoteExecutor {
    connectivity: Arc<ConnectivityMonitor>,
    unauthorized: Option<Arc<dyn UnauthorizedHandler>>,
}

impl RemoteExecutor {
    pub fn new(connectivity: Arc<ConnectivityMonitor>) -> Self {
        Self {
            connectivity,
            unauthorized: None,
        }
    }

    /// Attach the unauthorized handler invoked on 401 responses.
    pub fn with_unauthorized_handler(mut self, handler: Arc<dyn UnauthorizedHandler>) -> Self {
        self.unauthorized = Some(handler);
        self
    }

    /// Execute an operation whose transport already validated HTTP-level
    /// success: an `Ok` value is emitted as `Success` unchanged.
    pub fn execute<T, F, Fut>(&self, op: F) -> CallHandle<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, TransportError>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(CallResult::InProgress);
        let this = self.clone();
        tokio::spawn(async move {
            let terminal = match op().await {
                Ok(value) => CallResult::Success(value),
                Err(err) => CallResult::Error(this.classify(err)),
            };
            tx.send_replace(terminal);
        });
        CallHandle { rx }
    }

    /// Execute an operation returning a response envelope that carries its
    /// own success flag. A failure envelope is emitted as `Error(Remote)`
    /// with the message extracted from its error body.
    pub fn execute_enveloped<T, F, Fut>(&self, op: F) -> CallHandle<T>
    where
        T: Envelope + Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, TransportError>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(CallResult::InProgress);
        let this = self.clone();
        tokio::spawn(async move {
            let terminal = match op().await {
                Ok(env) if env.is_success() => CallResult::Success(env),
                Ok(env) => {
                    let message = env
                        .error_body()
                        .and_then(super::extract_error_message)
                        .unwrap_or_else(|| GENERIC_REMOTE_MSG.to_string());
                    warn!(message = %message, "remote call returned a failure envelope");
                    CallResult::Error(CallError::Remote(message))
                }
                Err(err) => CallResult::Error(this.classify(err)),
            };
            tx.send_replace(terminal);
        });
        CallHandle { rx }
    }

    fn classify(&self, err: TransportError) -> CallError {
        match err {
            TransportError::HostUnreachable(detail) => {
                warn!(detail = %detail, "host unreachable — scheduling connectivity probe");
                self.connectivity.check_connection_detached();
                CallError::Remote(NETWORK_UNREACHABLE_MSG.to_string())
            }
            TransportError::Http { status: 401, body } => {
                debug!("server rejected credentials — invoking unauthorized handler");
                if let Some(handler) = &self.unauthorized {
                    let handler = Arc::clone(handler);
                    tokio::spawn(async move {
                        handler.on_unauthorized().await;
                    });
                }
                CallError::Remote(message_for_status(401, body.as_deref()))
            }
            TransportError::Http { status, body } => {
                warn!(status, "remote call failed with http error");
                CallError::Remote(message_for_status(status, body.as_deref()))
            }
            TransportError::Decode(detail) => {
                warn!(detail = %detail, "failed to decode remote payload");
                if detail.trim().is_empty() {
                    CallError::Remote(MISMATCHED_DATA_MSG.to_string())
                } else {
                    CallError::Remote(detail)
                }
            }
            TransportError::Other(detail) => {
                warn!(detail = %detail, "remote call failed");
                if detail.trim().is_empty() {
                    CallError::Remote(GENERIC_REMOTE_MSG.to_string())
                } else {
                    CallError::Remote(detail)
                }
            }
        }
    }
}

impl std::fmt::Debug for RemoteExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteExecutor")
            .field("has_unauthorized_handler", &self.unauthorized.is_some())
            .finish()
    }
}

/// Replay-latest view of one executed call.
///
/// Clones observe the same underlying operation; dropping every handle
/// abandons the subscription without cancelling the call.
pub struct CallHandle<T> {
    rx: watch::Receiver<CallResult<T>>,
}

impl<T: Clone> CallHandle<T> {
    /// The value currently visible — `InProgress` until the call settles.
    pub fn current(&self) -> CallResult<T> {
        self.rx.borrow().clone()
    }

    /// Wait for and return the terminal result.
    pub async fn terminal(mut self) -> CallResult<T> {
        loop {
            {
                let value = self.rx.borrow_and_update().clone();
                if !value.is_in_progress() {
                    return value;
                }
            }
            if self.rx.changed().await.is_err() {
                // Sender gone; whatever was published last is the answer.
                return self.rx.borrow().clone();
            }
        }
    }

    /// Adapt into a `Stream` yielding the current value, then changes.
    pub fn into_stream(self) -> WatchStream<CallResult<T>>
    where
        T: Send + Sync + 'static,
    {
        WatchStream::new(self.rx)
    }
}

impl<T> Clone for CallHandle<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<T> std::fmt::Debug for CallHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallHandle").finish()
    }
}
