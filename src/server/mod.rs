//! MCP server layer: lifecycle, capabilities and feature wiring.
//!
//! This module implements the server side of the MCP lifecycle:
//!
//! 1. **Initialisation**: the peer sends `initialize`, the server answers
//!    with its identity and capabilities, and the peer confirms with the
//!    `initialized` notification
//! 2. **Operation**: feature handlers answer resource and tool requests
//! 3. **Shutdown**: [`McpServer::stop`] disconnects the transport
//!
//! # Architecture
//!
//! [`McpServer`] owns no feature logic itself; it wires handlers into the
//! protocol engine. Lifecycle handlers are registered at construction,
//! resource and tool handlers through
//! [`setup_resource_feature`](McpServer::setup_resource_feature) and
//! [`setup_tool_feature`](McpServer::setup_tool_feature). Mutable session
//! state (the initialisation flag, the peer's capabilities and the
//! subscription set) lives in [`ServerSession`], shared between the server
//! and its handlers.
//!
//! ```text
//!                 +-----------------+
//!                 |    McpServer    |
//!                 +--------+--------+
//!          wires           |          notifies via
//!   +----------------------+---------------------+
//!   v                      v                     v
//! InitializeHandler   resources/* and      ProtocolEngine
//! InitializedHandler  tools/* handlers    (send_notification)
//!   \                      |
//!    \                     v
//!     +------------> ServerSession
//!                 (initialised, subscriptions)
//! ```

pub mod handlers;

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::error::TransportError;
use crate::protocol::ProtocolEngine;
use crate::resources::ResourceProvider;
use crate::server::handlers::{
    InitializeHandler, InitializedHandler, ResourceListHandler, ResourceReadHandler,
    ResourceSubscribeHandler, ResourceTemplatesListHandler, ResourceUnsubscribeHandler,
};
use crate::tools::handlers::{ToolsCallHandler, ToolsListHandler};
use crate::tools::ToolRegistry;

/// Default server name advertised during initialisation.
pub const SERVER_NAME: &str = "conduit-mcp";

/// Server information advertised in the `initialize` result.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl ServerInfo {
    /// Creates server information with the given name and version.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Server capabilities advertised during initialisation.
///
/// Only enabled features appear in the serialised form; an enabled feature
/// with no flags set serialises as an empty object.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerCapabilities {
    /// Resource-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceCapabilities>,
    /// Tool-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolCapabilities>,
}

impl ServerCapabilities {
    /// Creates a capability set with every feature disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables the resource feature.
    #[must_use]
    pub fn with_resources(mut self, subscribe: bool, list_changed: bool) -> Self {
        self.resources = Some(ResourceCapabilities {
            subscribe,
            list_changed,
        });
        self
    }

    /// Enables the tool feature.
    #[must_use]
    pub fn with_tools(mut self) -> Self {
        self.tools = Some(ToolCapabilities::default());
        self
    }
}

/// Resource feature flags.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ResourceCapabilities {
    /// Whether the peer may subscribe to individual resources.
    #[serde(skip_serializing_if = "is_false")]
    pub subscribe: bool,
    /// Whether the server emits resource list change notifications.
    #[serde(rename = "listChanged", skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

/// Tool feature flags.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session.
    #[serde(rename = "listChanged", skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires a predicate fn(&T) -> bool, so we must take &bool here
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Result of the `initialize` request.
///
/// Members serialise in handshake order: `protocolVersion`, `serverInfo`,
/// `capabilities`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// The protocol version the server will speak.
    pub protocol_version: String,
    /// Server identity.
    pub server_info: ServerInfo,
    /// Features the server offers.
    pub capabilities: ServerCapabilities,
}

/// Mutable per-connection server state.
///
/// Shared between [`McpServer`] and its handlers so the initialisation
/// flag and the subscription set survive handler dispatch.
#[derive(Debug, Default)]
pub struct ServerSession {
    state: RwLock<SessionState>,
}

#[derive(Debug, Default)]
struct SessionState {
    initialized: bool,
    client_capabilities: Option<Value>,
    subscriptions: HashSet<String>,
}

impl ServerSession {
    /// Creates a fresh, uninitialised session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the `initialize` handshake has completed.
    pub async fn is_initialized(&self) -> bool {
        self.state.read().await.initialized
    }

    /// Marks the session initialised and stores the peer's capabilities.
    ///
    /// Returns `false` when the session was already initialised; the
    /// stored capabilities are left untouched in that case.
    pub async fn mark_initialized(&self, client_capabilities: Option<Value>) -> bool {
        let mut state = self.state.write().await;
        if state.initialized {
            return false;
        }
        state.initialized = true;
        state.client_capabilities = client_capabilities;
        true
    }

    /// The capabilities object the peer sent in `initialize`, if any.
    pub async fn client_capabilities(&self) -> Option<Value> {
        self.state.read().await.client_capabilities.clone()
    }

    /// Whether the peer is subscribed to this URI.
    pub async fn is_subscribed(&self, uri: &str) -> bool {
        self.state.read().await.subscriptions.contains(uri)
    }

    /// Records a subscription to this URI.
    pub async fn add_subscription(&self, uri: impl Into<String>) {
        self.state.write().await.subscriptions.insert(uri.into());
    }

    /// Drops the subscription to this URI, when present.
    pub async fn remove_subscription(&self, uri: &str) {
        self.state.write().await.subscriptions.remove(uri);
    }

    /// Number of active subscriptions.
    pub async fn subscription_count(&self) -> usize {
        self.state.read().await.subscriptions.len()
    }
}

/// The MCP server: lifecycle handling plus feature wiring over a
/// [`ProtocolEngine`].
#[derive(Debug)]
pub struct McpServer {
    /// The engine this server answers through.
    engine: Arc<ProtocolEngine>,
    /// Session state shared with the handlers.
    session: Arc<ServerSession>,
    /// Identity advertised in the `initialize` result.
    info: ServerInfo,
    /// Capabilities advertised in the `initialize` result.
    capabilities: ServerCapabilities,
}

impl McpServer {
    /// Creates a server over the engine and registers the lifecycle
    /// handlers: `initialize` and the `initialized` notification.
    pub async fn new(
        engine: Arc<ProtocolEngine>,
        info: ServerInfo,
        capabilities: ServerCapabilities,
    ) -> Self {
        let session = Arc::new(ServerSession::new());
        engine
            .register_request_handler(Arc::new(InitializeHandler::new(
                Arc::clone(&session),
                info.clone(),
                capabilities.clone(),
            )))
            .await;
        engine
            .register_notification_handler(Arc::new(InitializedHandler))
            .await;
        Self {
            engine,
            session,
            info,
            capabilities,
        }
    }

    /// The protocol engine this server is wired into.
    #[must_use]
    pub const fn engine(&self) -> &Arc<ProtocolEngine> {
        &self.engine
    }

    /// The shared session state.
    #[must_use]
    pub const fn session(&self) -> &Arc<ServerSession> {
        &self.session
    }

    /// Server identity advertised to the peer.
    #[must_use]
    pub const fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// Capabilities advertised to the peer.
    #[must_use]
    pub const fn capabilities(&self) -> &ServerCapabilities {
        &self.capabilities
    }

    /// Registers the resource feature: the five `resources/*` request
    /// handlers backed by the given provider.
    ///
    /// `page_size` caps the number of resources per `resources/list` page.
    pub async fn setup_resource_feature(
        &self,
        provider: Arc<dyn ResourceProvider>,
        page_size: usize,
    ) {
        self.engine
            .register_request_handler(Arc::new(ResourceListHandler::new(
                Arc::clone(&provider),
                page_size,
            )))
            .await;
        self.engine
            .register_request_handler(Arc::new(ResourceReadHandler::new(Arc::clone(&provider))))
            .await;
        self.engine
            .register_request_handler(Arc::new(ResourceTemplatesListHandler::new(Arc::clone(
                &provider,
            ))))
            .await;
        self.engine
            .register_request_handler(Arc::new(ResourceSubscribeHandler::new(
                Arc::clone(&provider),
                Arc::clone(&self.session),
            )))
            .await;
        self.engine
            .register_request_handler(Arc::new(ResourceUnsubscribeHandler::new(
                provider,
                Arc::clone(&self.session),
            )))
            .await;
        tracing::debug!(page_size, "resource feature enabled");
    }

    /// Registers the tool feature: `tools/list` plus the shared
    /// `tools/call` and `tools/execute` handler.
    pub async fn setup_tool_feature(&self, registry: Arc<ToolRegistry>) {
        self.engine
            .register_request_handler(Arc::new(ToolsListHandler::new(Arc::clone(&registry))))
            .await;
        self.engine
            .register_request_handler(Arc::new(ToolsCallHandler::new(registry)))
            .await;
        tracing::debug!("tool feature enabled");
    }

    /// Connects the transport and serves until the peer disconnects or
    /// [`stop`](Self::stop) is called.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the connection cannot be established
    /// or fails mid-session.
    pub async fn run(&self) -> Result<(), TransportError> {
        self.engine.connect()?;
        tracing::info!(
            name = %self.info.name,
            version = %self.info.version,
            "server started"
        );
        self.engine.run().await
    }

    /// Runs the server with graceful shutdown on SIGINT and SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the connection cannot be established
    /// or fails mid-session. Shutdown by signal is not an error.
    #[cfg(unix)]
    pub async fn run_with_shutdown(&self) -> Result<(), TransportError> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, initiating graceful shutdown");
                self.stop().await;
                Ok(())
            }

            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
                self.stop().await;
                Ok(())
            }

            result = self.run() => result,
        }
    }

    /// Runs the server with graceful shutdown on Ctrl+C.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the connection cannot be established
    /// or fails mid-session. Shutdown by signal is not an error.
    #[cfg(windows)]
    pub async fn run_with_shutdown(&self) -> Result<(), TransportError> {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                self.stop().await;
                Ok(())
            }

            result = self.run() => result,
        }
    }

    /// Stops the server and disconnects the transport.
    pub async fn stop(&self) {
        tracing::info!("server stopping");
        self.engine.disconnect().await;
    }

    /// Tells the peer a resource changed, if it subscribed to it.
    ///
    /// Returns `true` when the notification was sent and `false` when the
    /// peer holds no subscription for this URI.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the notification cannot be sent.
    pub async fn notify_resource_updated(&self, uri: &str) -> Result<bool, TransportError> {
        if !self.session.is_subscribed(uri).await {
            tracing::debug!(uri, "update suppressed, peer not subscribed");
            return Ok(false);
        }
        self.engine
            .send_notification(
                "notifications/resources/updated",
                Some(json!({ "uri": uri })),
            )
            .await?;
        Ok(true)
    }

    /// Tells the peer the set of available resources changed. Sent
    /// regardless of subscriptions.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the notification cannot be sent.
    pub async fn notify_resource_list_changed(&self) -> Result<(), TransportError> {
        self.engine
            .send_notification("notifications/resources/list_changed", None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protocol::MCP_PROTOCOL_VERSION;

    #[test]
    fn disabled_capabilities_serialise_to_an_empty_object() {
        let value = serde_json::to_value(ServerCapabilities::new()).unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn enabled_features_appear_with_their_flags() {
        let capabilities = ServerCapabilities::new()
            .with_resources(true, true)
            .with_tools();
        let value = serde_json::to_value(capabilities).unwrap();
        assert_eq!(
            value,
            json!({
                "resources": { "subscribe": true, "listChanged": true },
                "tools": {}
            })
        );
    }

    #[test]
    fn false_flags_are_omitted_from_the_capability_object() {
        let capabilities = ServerCapabilities::new().with_resources(false, true);
        let value = serde_json::to_value(capabilities).unwrap();
        assert_eq!(value, json!({ "resources": { "listChanged": true } }));
    }

    #[test]
    fn initialize_result_members_are_in_handshake_order() {
        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            server_info: ServerInfo::default(),
            capabilities: ServerCapabilities::new().with_tools(),
        };
        let value = serde_json::to_value(&result).unwrap();
        let keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["protocolVersion", "serverInfo", "capabilities"]);
    }

    #[test]
    fn default_server_info_uses_the_crate_identity() {
        let info = ServerInfo::default();
        assert_eq!(info.name, SERVER_NAME);
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn session_initialises_exactly_once() {
        let session = ServerSession::new();
        assert!(!session.is_initialized().await);

        assert!(session.mark_initialized(Some(json!({ "roots": {} }))).await);
        assert!(session.is_initialized().await);
        assert_eq!(
            session.client_capabilities().await,
            Some(json!({ "roots": {} }))
        );

        // A repeat attempt neither flips the flag nor clobbers the
        // stored capabilities.
        assert!(!session.mark_initialized(None).await);
        assert_eq!(
            session.client_capabilities().await,
            Some(json!({ "roots": {} }))
        );
    }

    #[tokio::test]
    async fn subscriptions_are_tracked_per_uri() {
        let session = ServerSession::new();
        session.add_subscription("memo://a").await;
        session.add_subscription("memo://b").await;
        assert!(session.is_subscribed("memo://a").await);
        assert!(!session.is_subscribed("memo://c").await);
        assert_eq!(session.subscription_count().await, 2);

        session.remove_subscription("memo://a").await;
        assert!(!session.is_subscribed("memo://a").await);

        // Removing an absent subscription changes nothing.
        session.remove_subscription("memo://zzz").await;
        assert_eq!(session.subscription_count().await, 1);
    }
}
