//! Handler traits and the ordered handler registry.
//!
//! Inbound requests and notifications are dispatched to handlers via
//! `can_handle` probing: handlers are asked in registration order and the
//! first acceptor wins, so registration order is dispatch priority. Exactly
//! one handler sees a given message.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::RpcError;

/// Handles inbound requests for the methods it claims.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Whether this handler wants the given method.
    fn can_handle(&self, method: &str) -> bool;

    /// Produces the result for a claimed request.
    ///
    /// # Errors
    ///
    /// The returned [`RpcError`] is serialised into the error response
    /// verbatim, so handlers control the error code the peer sees.
    async fn handle_request(
        &self,
        method: &str,
        params: Option<&Value>,
    ) -> Result<Value, RpcError>;
}

/// Handles inbound notifications for the methods it claims.
///
/// Notifications are never answered; failures are logged by the engine and
/// otherwise dropped.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    /// Whether this handler wants the given method.
    fn can_handle(&self, method: &str) -> bool;

    /// Processes a claimed notification.
    ///
    /// # Errors
    ///
    /// Returns an [`RpcError`] describing the failure; it is logged, not
    /// sent, because notifications have no reply channel.
    async fn handle_notification(
        &self,
        method: &str,
        params: Option<&Value>,
    ) -> Result<(), RpcError>;
}

/// Ordered registries for request and notification handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    requests: RwLock<Vec<Arc<dyn RequestHandler>>>,
    notifications: RwLock<Vec<Arc<dyn NotificationHandler>>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a request handler. Earlier registrations have priority.
    pub async fn register_request_handler(&self, handler: Arc<dyn RequestHandler>) {
        self.requests.write().await.push(handler);
    }

    /// Appends a notification handler. Earlier registrations have priority.
    pub async fn register_notification_handler(&self, handler: Arc<dyn NotificationHandler>) {
        self.notifications.write().await.push(handler);
    }

    /// Finds the first request handler claiming `method`.
    ///
    /// The handler is cloned out of the registry so no lock is held while
    /// it runs.
    pub async fn find_request_handler(&self, method: &str) -> Option<Arc<dyn RequestHandler>> {
        self.requests
            .read()
            .await
            .iter()
            .find(|handler| handler.can_handle(method))
            .cloned()
    }

    /// Finds the first notification handler claiming `method`.
    pub async fn find_notification_handler(
        &self,
        method: &str,
    ) -> Option<Arc<dyn NotificationHandler>> {
        self.notifications
            .read()
            .await
            .iter()
            .find(|handler| handler.can_handle(method))
            .cloned()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry").finish_non_exhaustive()
    }
}
