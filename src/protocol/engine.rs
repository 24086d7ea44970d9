//! The JSON-RPC 2.0 protocol engine.
//!
//! [`ProtocolEngine`] sits directly on a [`StreamTransport`] and gives the
//! process both roles at once:
//!
//! - **client**: [`send_request`](ProtocolEngine::send_request) correlates
//!   each outgoing request with the matching inbound response by ID, with a
//!   timeout; [`send_notification`](ProtocolEngine::send_notification) is
//!   fire-and-forget
//! - **server**: inbound requests and notifications are dispatched to the
//!   first registered handler that claims the method
//!
//! Requests in flight are tracked in a pending table keyed by request ID.
//! Awaiting callers are suspended on per-request channels and woken by
//! whichever task drives the transport, so many requests can be outstanding
//! at once and responses may arrive in any order.
//!
//! # Demultiplexing
//!
//! Every inbound message goes through
//! [`handle_message`](ProtocolEngine::handle_message):
//!
//! 1. not JSON-RPC 2.0: answered with -32600 when an ID is present,
//!    otherwise dropped
//! 2. carries `result` or `error`: resolves the pending request with that
//!    ID; unknown or absent IDs are ignored (late replies land here)
//! 3. carries `method` and an ID: request dispatch; no claiming handler
//!    means -32601
//! 4. carries `method` without an ID: notification dispatch; handler
//!    failures are logged, never answered

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{oneshot, Mutex};

use crate::error::{RequestError, RpcError, TransportError};
use crate::protocol::handler::{HandlerRegistry, NotificationHandler, RequestHandler};
use crate::protocol::message::{
    JsonRpcErrorResponse, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, Message, RequestId,
};
use crate::transport::StreamTransport;

/// Timeout applied to requests when the caller has no better idea.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How a pending request ended.
#[derive(Debug)]
enum Resolution {
    /// The peer answered with a `result`.
    Result(Value),
    /// The peer answered with an `error` object.
    Error(RpcError),
    /// The connection went away before an answer arrived.
    Closed,
}

/// A JSON-RPC 2.0 engine bound to one transport.
pub struct ProtocolEngine {
    transport: Arc<StreamTransport>,
    handlers: HandlerRegistry,
    pending: Mutex<HashMap<RequestId, oneshot::Sender<Resolution>>>,
    next_id: AtomicI64,
}

impl ProtocolEngine {
    /// Creates an engine on the given transport and hooks its
    /// demultiplexer into the transport's message callbacks.
    ///
    /// The callback holds only a weak reference, so dropping the engine
    /// does not leak through the transport.
    pub async fn new(transport: Arc<StreamTransport>) -> Arc<Self> {
        let engine = Arc::new(Self {
            transport: Arc::clone(&transport),
            handlers: HandlerRegistry::new(),
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        });

        let weak = Arc::downgrade(&engine);
        transport
            .on_message(move |message| {
                let weak = weak.clone();
                Box::pin(async move {
                    if let Some(engine) = weak.upgrade() {
                        engine.handle_message(message).await;
                    }
                })
            })
            .await;

        engine
    }

    /// The transport this engine is bound to.
    #[must_use]
    pub fn transport(&self) -> &Arc<StreamTransport> {
        &self.transport
    }

    /// Whether the underlying transport is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Connects the underlying transport.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] if the transport was already
    /// disconnected.
    pub fn connect(&self) -> Result<(), TransportError> {
        self.transport.connect()
    }

    /// Disconnects the transport and fails every pending request.
    ///
    /// All callers suspended in [`send_request`](Self::send_request) are
    /// woken with [`RequestError::Closed`]; none is left waiting for its
    /// timeout.
    pub async fn disconnect(&self) {
        self.transport.disconnect().await;
        self.fail_pending().await;
    }

    /// Drives the transport until the stream ends, then fails any requests
    /// still pending.
    ///
    /// # Errors
    ///
    /// Returns decode or I/O errors from the transport; a clean end of
    /// stream is `Ok(())`.
    pub async fn run(&self) -> Result<(), TransportError> {
        let result = self.transport.read_loop().await;
        self.fail_pending().await;
        result
    }

    /// Appends a request handler. Earlier registrations have priority.
    pub async fn register_request_handler(&self, handler: Arc<dyn RequestHandler>) {
        self.handlers.register_request_handler(handler).await;
    }

    /// Appends a notification handler. Earlier registrations have priority.
    pub async fn register_notification_handler(&self, handler: Arc<dyn NotificationHandler>) {
        self.handlers.register_notification_handler(handler).await;
    }

    /// Sends a request and waits for the matching response.
    ///
    /// IDs are allocated from a monotonic counter and never reused while
    /// outstanding, so concurrent requests cannot collide and responses may
    /// arrive in any order.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Transport`] when the request cannot be sent; the
    ///   pending entry is rolled back
    /// - [`RequestError::Timeout`] when no response arrives in time; a
    ///   response arriving later is ignored
    /// - [`RequestError::Closed`] when the connection goes away first
    /// - [`RequestError::Rpc`] when the peer answers with an error object
    pub async fn send_request(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value, RequestError> {
        let id = RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), sender);

        let request = JsonRpcRequest::new(id.clone(), method, params);
        if let Err(error) = self.transport.send(&request).await {
            self.pending.lock().await.remove(&id);
            return Err(error.into());
        }
        tracing::debug!(id = %id, method, "request sent");

        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(Resolution::Result(value))) => Ok(value),
            Ok(Ok(Resolution::Error(error))) => Err(RequestError::Rpc(error)),
            Ok(Ok(Resolution::Closed)) | Ok(Err(_)) => Err(RequestError::Closed),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(RequestError::Timeout {
                    method: method.to_string(),
                    timeout,
                })
            }
        }
    }

    /// Sends a notification. No response will ever arrive.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the notification cannot be sent.
    pub async fn send_notification(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<(), TransportError> {
        let notification = JsonRpcNotification::new(method, params);
        self.transport.send(&notification).await
    }

    /// Demultiplexes one inbound message.
    ///
    /// This is the transport callback target; it is public so hosts that
    /// drive the transport themselves can feed messages in directly.
    pub async fn handle_message(&self, message: Value) {
        match Message::from_value(message) {
            Message::Response { id, result } => {
                self.resolve_pending(id, Resolution::Result(result)).await;
            }
            Message::Error { id, error } => {
                self.resolve_pending(id, Resolution::Error(error)).await;
            }
            Message::Request { id, method, params } => {
                self.dispatch_request(id, &method, params.as_ref()).await;
            }
            Message::Notification { method, params } => {
                self.dispatch_notification(&method, params.as_ref()).await;
            }
            Message::Invalid { id: Some(id) } => {
                let error =
                    RpcError::invalid_request("message is not a valid JSON-RPC 2.0 message");
                self.send_error_response(id, error).await;
            }
            Message::Invalid { id: None } => {
                tracing::warn!("discarding unrecognisable message without id");
            }
        }
    }

    /// Wakes the caller waiting on `id`, if it is still waiting.
    async fn resolve_pending(&self, id: Option<RequestId>, resolution: Resolution) {
        let Some(id) = id else {
            tracing::warn!("discarding response without id");
            return;
        };
        let sender = self.pending.lock().await.remove(&id);
        match sender {
            // The receiver may have timed out in the meantime; that race is
            // benign, so the send result is deliberately ignored.
            Some(sender) => {
                let _ = sender.send(resolution);
            }
            None => tracing::warn!(id = %id, "discarding response for unknown request"),
        }
    }

    async fn dispatch_request(&self, id: RequestId, method: &str, params: Option<&Value>) {
        tracing::debug!(id = %id, method, "dispatching request");
        let outcome = match self.handlers.find_request_handler(method).await {
            Some(handler) => handler.handle_request(method, params).await,
            None => Err(RpcError::method_not_found(method)),
        };
        match outcome {
            Ok(result) => {
                let response = JsonRpcResponse::success(id, result);
                if let Err(error) = self.transport.send(&response).await {
                    tracing::error!(error = %error, method, "failed to send response");
                }
            }
            Err(error) => {
                tracing::debug!(code = error.code, method, "request failed");
                self.send_error_response(id, error).await;
            }
        }
    }

    async fn dispatch_notification(&self, method: &str, params: Option<&Value>) {
        tracing::debug!(method, "dispatching notification");
        match self.handlers.find_notification_handler(method).await {
            Some(handler) => {
                // Notifications have no reply channel: failures are logged
                // and dropped.
                if let Err(error) = handler.handle_notification(method, params).await {
                    tracing::warn!(error = %error, method, "notification handler failed");
                }
            }
            None => tracing::debug!(method, "no handler claims notification"),
        }
    }

    async fn send_error_response(&self, id: RequestId, error: RpcError) {
        let response = JsonRpcErrorResponse::new(id, error);
        if let Err(error) = self.transport.send(&response).await {
            tracing::error!(error = %error, "failed to send error response");
        }
    }

    /// Fails every pending request with [`Resolution::Closed`].
    async fn fail_pending(&self) {
        let drained: Vec<_> = self.pending.lock().await.drain().collect();
        for (id, sender) in drained {
            tracing::debug!(id = %id, "failing pending request: connection closed");
            let _ = sender.send(Resolution::Closed);
        }
    }
}

impl std::fmt::Debug for ProtocolEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolEngine")
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}
