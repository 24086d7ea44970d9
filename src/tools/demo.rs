//! Demo tools hosted by the bundled binary.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::tools::Tool;

/// Greets whoever is named in the arguments.
pub struct HelloTool;

#[async_trait]
impl Tool for HelloTool {
    fn name(&self) -> &str {
        "say-hello"
    }

    fn description(&self) -> &str {
        "Say hello to someone"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Name to greet"
                }
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, arguments: Value) -> anyhow::Result<Value> {
        let name = arguments
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("world");
        Ok(Value::String(format!("Hello, {name}!")))
    }
}

/// Reports the current local time.
pub struct ClockTool;

#[async_trait]
impl Tool for ClockTool {
    fn name(&self) -> &str {
        "get-time"
    }

    fn description(&self) -> &str {
        "Get the current time"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, _arguments: Value) -> anyhow::Result<Value> {
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        Ok(Value::String(now.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hello_greets_by_name() {
        let result = HelloTool.execute(json!({"name": "Ada"})).await.unwrap();
        assert_eq!(result, json!("Hello, Ada!"));
    }

    #[tokio::test]
    async fn hello_defaults_to_world() {
        let result = HelloTool.execute(json!({})).await.unwrap();
        assert_eq!(result, json!("Hello, world!"));
    }

    #[tokio::test]
    async fn clock_formats_a_timestamp() {
        let result = ClockTool.execute(json!({})).await.unwrap();
        let text = result.as_str().unwrap();
        chrono::NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
            .expect("timestamp should match the advertised format");
    }
}
