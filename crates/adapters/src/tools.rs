// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! Tool registry: a JSON-schema description plus a string-returning
//! executor per tool, matching the Python prototype's `get_tools()`
//! convention (tool name, JSON-schema args, a callable).

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, args: Value) -> String;
}

/// Maps tool names to schemas and executors. `execute` never raises for an
/// unknown tool — it returns a warning string, matching the prototype's
/// "tools never crash the loop" convention.
#[derive(Default)]
pub struct ToolRegistry {
    schemas: HashMap<String, ToolSchema>,
    executors: HashMap<String, Arc<dyn ToolExecutor>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, schema: ToolSchema, executor: Arc<dyn ToolExecutor>) {
        self.executors.insert(schema.name.clone(), executor);
        self.schemas.insert(schema.name.clone(), schema);
    }

    pub fn schemas(&self) -> Vec<&ToolSchema> {
        self.schemas.values().collect()
    }

    pub async fn execute(&self, name: &str, args: Value) -> String {
        match self.executors.get(name) {
            Some(executor) => executor.execute(args).await,
            None => format!("⚠️ UNKNOWN_TOOL: no tool registered named {name:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl ToolExecutor for EchoTool {
        async fn execute(&self, args: Value) -> String {
            args.to_string()
        }
    }

    #[tokio::test]
    async fn unknown_tool_returns_a_warning_string_not_a_panic() {
        let registry = ToolRegistry::new();
        let out = registry.execute("does_not_exist", Value::Null).await;
        assert!(out.starts_with("⚠️ UNKNOWN_TOOL"));
    }

    #[tokio::test]
    async fn registered_tool_executes_and_returns_its_string() {
        let mut registry = ToolRegistry::new();
        registry.register(
            ToolSchema { name: "echo".to_string(), description: "echoes args".to_string(), parameters: Value::Null },
            Arc::new(EchoTool),
        );
        let out = registry.execute("echo", serde_json::json!({"a": 1})).await;
        assert_eq!(out, r#"{"a":1}"#);
    }
}
