//! Request handlers for the tool feature.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::RpcError;
use crate::protocol::handler::RequestHandler;
use crate::tools::ToolRegistry;

/// Answers `tools/list` with the registry's descriptors.
pub struct ToolsListHandler {
    registry: Arc<ToolRegistry>,
}

impl ToolsListHandler {
    /// Creates the handler over a shared registry.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl RequestHandler for ToolsListHandler {
    fn can_handle(&self, method: &str) -> bool {
        method == "tools/list"
    }

    async fn handle_request(
        &self,
        _method: &str,
        _params: Option<&Value>,
    ) -> Result<Value, RpcError> {
        tracing::debug!(tools = self.registry.len(), "listing tools");
        Ok(json!({ "tools": self.registry.descriptors() }))
    }
}

/// Executes tools for both `tools/call` and `tools/execute`.
///
/// The two methods share lookup and execution and differ only in result
/// shape: `tools/call` wraps the result in a text content block
/// (JSON-encoding non-string results), `tools/execute` returns it raw
/// under `result`.
pub struct ToolsCallHandler {
    registry: Arc<ToolRegistry>,
}

impl ToolsCallHandler {
    /// Creates the handler over a shared registry.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl RequestHandler for ToolsCallHandler {
    fn can_handle(&self, method: &str) -> bool {
        method == "tools/call" || method == "tools/execute"
    }

    async fn handle_request(
        &self,
        method: &str,
        params: Option<&Value>,
    ) -> Result<Value, RpcError> {
        let name = params
            .and_then(|params| params.get("name"))
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tool name not specified"))?;

        let tool = self
            .registry
            .get(name)
            .ok_or_else(|| RpcError::application(format!("Unknown tool: {name}")))?;

        let arguments = params
            .and_then(|params| params.get("arguments"))
            .cloned()
            .unwrap_or_else(|| json!({}));

        tracing::debug!(tool = name, method, "executing tool");
        let result = tool
            .execute(arguments)
            .await
            .map_err(|error| RpcError::application(format!("Tool execution failed: {error:#}")))?;

        if method == "tools/call" {
            let text = match result {
                Value::String(text) => text,
                other => other.to_string(),
            };
            Ok(json!({ "content": [{ "type": "text", "text": text }] }))
        } else {
            Ok(json!({ "result": result }))
        }
    }
}
