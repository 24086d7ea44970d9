//! Tool feature: named operations the peer can invoke.
//!
//! Tools are registered once at startup in a [`ToolRegistry`] and exposed
//! through `tools/list` plus two invocation methods with different result
//! shapes:
//!
//! - `tools/call` wraps the result in a text content block
//! - `tools/execute` returns the raw result under `result`
//!
//! Listing order is registration order.

pub mod demo;
pub mod handlers;

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

pub use demo::{ClockTool, HelloTool};
pub use handlers::{ToolsCallHandler, ToolsListHandler};

/// A named operation invokable by the peer.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name.
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON Schema describing the accepted arguments.
    fn input_schema(&self) -> Value;

    /// Runs the tool.
    ///
    /// `arguments` is the `arguments` member of the call, or an empty
    /// object when the caller sent none.
    ///
    /// # Errors
    ///
    /// Any failure; it is reported to the peer as an application error.
    async fn execute(&self, arguments: Value) -> anyhow::Result<Value>;
}

/// What `tools/list` advertises for one tool.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// Tool name, as accepted by `tools/call`.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the arguments.
    pub input_schema: Value,
}

/// Registration-ordered collection of tools.
///
/// Built once at startup and shared immutably with the handlers.
/// Registering a name twice replaces the tool in place.
#[derive(Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool under its own name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Looks a tool up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Descriptors for every tool, in registration order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|tool| ToolDescriptor {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.input_schema(),
            })
            .collect()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct NamedTool(&'static str);

    #[async_trait]
    impl Tool for NamedTool {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "a test tool"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object", "properties": {}, "required": []})
        }

        async fn execute(&self, _arguments: Value) -> anyhow::Result<Value> {
            Ok(json!(self.0))
        }
    }

    #[test]
    fn descriptors_keep_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(NamedTool("zeta")));
        registry.register(Arc::new(NamedTool("alpha")));

        let names: Vec<String> = registry
            .descriptors()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, ["zeta", "alpha"]);
    }

    #[test]
    fn descriptor_serialises_input_schema_member() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(NamedTool("t")));

        let json = serde_json::to_value(registry.descriptors()).unwrap();
        assert_eq!(json[0]["name"], "t");
        assert_eq!(json[0]["inputSchema"]["type"], "object");
    }

    #[test]
    fn re_registering_replaces_in_place() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(NamedTool("a")));
        registry.register(Arc::new(NamedTool("b")));
        registry.register(Arc::new(NamedTool("a")));

        assert_eq!(registry.len(), 2);
        let names: Vec<String> = registry
            .descriptors()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn get_finds_registered_tools() {
        let mut registry = ToolRegistry::new();
        assert!(registry.is_empty());
        registry.register(Arc::new(NamedTool("a")));
        assert!(registry.get("a").is_some());
        assert!(registry.get("b").is_none());
    }
}
