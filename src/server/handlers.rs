//! Built-in lifecycle and resource request handlers.
//!
//! These are the handlers [`McpServer`](crate::server::McpServer) wires
//! into the engine: the `initialize`/`initialized` lifecycle pair at
//! construction and the five `resources/*` handlers when the resource
//! feature is enabled. Tool handlers live with the tool feature in
//! [`crate::tools::handlers`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::RpcError;
use crate::protocol::handler::{NotificationHandler, RequestHandler};
use crate::protocol::message::MCP_PROTOCOL_VERSION;
use crate::resources::ResourceProvider;
use crate::server::{InitializeResult, ServerCapabilities, ServerInfo, ServerSession};

/// Extracts the mandatory `uri` string parameter.
fn required_uri(params: Option<&Value>) -> Result<&str, RpcError> {
    params
        .and_then(|params| params.get("uri"))
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::invalid_params("Missing required parameter: uri"))
}

/// Answers `initialize` with the server's identity and capabilities.
///
/// The first `initialize` wins; repeats are rejected as invalid requests.
pub struct InitializeHandler {
    session: Arc<ServerSession>,
    info: ServerInfo,
    capabilities: ServerCapabilities,
}

impl InitializeHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(
        session: Arc<ServerSession>,
        info: ServerInfo,
        capabilities: ServerCapabilities,
    ) -> Self {
        Self {
            session,
            info,
            capabilities,
        }
    }
}

#[async_trait]
impl RequestHandler for InitializeHandler {
    fn can_handle(&self, method: &str) -> bool {
        method == "initialize"
    }

    async fn handle_request(
        &self,
        _method: &str,
        params: Option<&Value>,
    ) -> Result<Value, RpcError> {
        if self.session.is_initialized().await {
            return Err(RpcError::invalid_request("Server already initialized"));
        }

        let Some(Value::Object(params)) = params else {
            return Err(RpcError::invalid_params(
                "initialize requires a params object",
            ));
        };

        let protocol_version = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(MCP_PROTOCOL_VERSION);
        let client_capabilities = params.get("capabilities").cloned();

        if !self.session.mark_initialized(client_capabilities).await {
            return Err(RpcError::invalid_request("Server already initialized"));
        }

        let client_name = params
            .get("clientInfo")
            .and_then(|info| info.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        tracing::info!(client = client_name, protocol_version, "initialize handshake");

        let result = InitializeResult {
            protocol_version: protocol_version.to_string(),
            server_info: self.info.clone(),
            capabilities: self.capabilities.clone(),
        };
        serde_json::to_value(result).map_err(|error| {
            RpcError::internal(format!("Failed to serialise initialize result: {error}"))
        })
    }
}

/// Accepts the notification that completes the handshake.
///
/// Claims both the bare `initialized` name and the namespaced
/// `notifications/initialized` alias; clients differ on which they send.
pub struct InitializedHandler;

#[async_trait]
impl NotificationHandler for InitializedHandler {
    fn can_handle(&self, method: &str) -> bool {
        matches!(method, "initialized" | "notifications/initialized")
    }

    async fn handle_notification(
        &self,
        _method: &str,
        _params: Option<&Value>,
    ) -> Result<(), RpcError> {
        tracing::info!("client initialisation completed");
        Ok(())
    }
}

/// Answers `resources/list` with one provider page.
pub struct ResourceListHandler {
    provider: Arc<dyn ResourceProvider>,
    page_size: usize,
}

impl ResourceListHandler {
    /// Creates the handler; `page_size` caps resources per page.
    #[must_use]
    pub fn new(provider: Arc<dyn ResourceProvider>, page_size: usize) -> Self {
        Self {
            provider,
            page_size,
        }
    }
}

#[async_trait]
impl RequestHandler for ResourceListHandler {
    fn can_handle(&self, method: &str) -> bool {
        method == "resources/list"
    }

    async fn handle_request(
        &self,
        _method: &str,
        params: Option<&Value>,
    ) -> Result<Value, RpcError> {
        let cursor = params
            .and_then(|params| params.get("cursor"))
            .and_then(Value::as_str);

        let page = self
            .provider
            .list_resources(cursor, self.page_size)
            .await
            .map_err(|error| RpcError::internal(format!("Failed to list resources: {error:#}")))?;

        let mut result = json!({ "resources": page.resources });
        if let Some(next_cursor) = page.next_cursor {
            result["nextCursor"] = Value::String(next_cursor);
        }
        Ok(result)
    }
}

/// Answers `resources/read` with the contents of one resource.
pub struct ResourceReadHandler {
    provider: Arc<dyn ResourceProvider>,
}

impl ResourceReadHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(provider: Arc<dyn ResourceProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl RequestHandler for ResourceReadHandler {
    fn can_handle(&self, method: &str) -> bool {
        method == "resources/read"
    }

    async fn handle_request(
        &self,
        _method: &str,
        params: Option<&Value>,
    ) -> Result<Value, RpcError> {
        let uri = required_uri(params)?;

        let exists = self
            .provider
            .resource_exists(uri)
            .await
            .map_err(|error| RpcError::internal(format!("Failed to read resource: {error:#}")))?;
        if !exists {
            return Err(RpcError::resource_not_found(uri));
        }

        let contents = self
            .provider
            .read_resource(uri)
            .await
            .map_err(|error| RpcError::internal(format!("Failed to read resource: {error:#}")))?;
        Ok(json!({ "contents": contents }))
    }
}

/// Answers `resources/templates/list` with every template the provider
/// offers.
pub struct ResourceTemplatesListHandler {
    provider: Arc<dyn ResourceProvider>,
}

impl ResourceTemplatesListHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(provider: Arc<dyn ResourceProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl RequestHandler for ResourceTemplatesListHandler {
    fn can_handle(&self, method: &str) -> bool {
        method == "resources/templates/list"
    }

    async fn handle_request(
        &self,
        _method: &str,
        _params: Option<&Value>,
    ) -> Result<Value, RpcError> {
        let templates = self.provider.list_resource_templates().await.map_err(|error| {
            RpcError::internal(format!("Failed to list resource templates: {error:#}"))
        })?;
        Ok(json!({ "resourceTemplates": templates }))
    }
}

/// Answers `resources/subscribe` by recording the subscription.
///
/// Subscribing to a URI the provider does not know is rejected with the
/// resource-not-found code.
pub struct ResourceSubscribeHandler {
    provider: Arc<dyn ResourceProvider>,
    session: Arc<ServerSession>,
}

impl ResourceSubscribeHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(provider: Arc<dyn ResourceProvider>, session: Arc<ServerSession>) -> Self {
        Self { provider, session }
    }
}

#[async_trait]
impl RequestHandler for ResourceSubscribeHandler {
    fn can_handle(&self, method: &str) -> bool {
        method == "resources/subscribe"
    }

    async fn handle_request(
        &self,
        _method: &str,
        params: Option<&Value>,
    ) -> Result<Value, RpcError> {
        let uri = required_uri(params)?;

        let exists = self.provider.resource_exists(uri).await.map_err(|error| {
            RpcError::internal(format!("Failed to subscribe to resource: {error:#}"))
        })?;
        if !exists {
            return Err(RpcError::resource_not_found(uri));
        }

        self.session.add_subscription(uri).await;
        tracing::debug!(uri, "resource subscription added");
        Ok(json!({}))
    }
}

/// Answers `resources/unsubscribe` by dropping the subscription.
///
/// Unsubscribing from a URI that was never subscribed succeeds; the
/// request only fails when the provider does not know the URI at all.
pub struct ResourceUnsubscribeHandler {
    provider: Arc<dyn ResourceProvider>,
    session: Arc<ServerSession>,
}

impl ResourceUnsubscribeHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(provider: Arc<dyn ResourceProvider>, session: Arc<ServerSession>) -> Self {
        Self { provider, session }
    }
}

#[async_trait]
impl RequestHandler for ResourceUnsubscribeHandler {
    fn can_handle(&self, method: &str) -> bool {
        method == "resources/unsubscribe"
    }

    async fn handle_request(
        &self,
        _method: &str,
        params: Option<&Value>,
    ) -> Result<Value, RpcError> {
        let uri = required_uri(params)?;

        let exists = self.provider.resource_exists(uri).await.map_err(|error| {
            RpcError::internal(format!("Failed to unsubscribe from resource: {error:#}"))
        })?;
        if !exists {
            return Err(RpcError::resource_not_found(uri));
        }

        self.session.remove_subscription(uri).await;
        tracing::debug!(uri, "resource subscription removed");
        Ok(json!({}))
    }
}
