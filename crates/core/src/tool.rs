//! Tool trait, the abstraction over agent capabilities.
//!
//! Tools are what give the agent the ability to act: evaluate arithmetic,
//! search the web, and so on. Each one exposes a name, a description, and a
//! JSON Schema for its parameters, which are sent to the LLM verbatim.

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// The core Tool trait.
///
/// Each tool implements this trait and is registered in the [`ToolRegistry`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "calculator", "web_search").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments and return its result text.
    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
///
/// Tools are kept in registration order so the schema list sent to the LLM
/// is identical on every call. Re-registering a name replaces the tool in
/// place.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    ///
    /// The name is used verbatim both for lookup and in the schema sent to
    /// the LLM, so it must be non-empty and carry no surrounding whitespace.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        if name.trim().is_empty() {
            return Err(ToolError::Registration("Tool must have a name".into()));
        }
        if name.trim() != name {
            return Err(ToolError::Registration(format!(
                "Tool name {name:?} has surrounding whitespace"
            )));
        }

        match self.index.get(&name) {
            Some(&slot) => {
                debug!(tool = %name, "Replacing registered tool");
                self.tools[slot] = tool;
            }
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.index.get(name).map(|&slot| self.tools[slot].as_ref())
    }

    /// All tool definitions in registration order (for sending to the LLM).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// Execute a tool by name. Tool failures are returned unchanged.
    pub async fn execute(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<String, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.execute(arguments).await
    }

    /// List all registered tool names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool that echoes a field, tagged with a label.
    struct EchoTool {
        name: &'static str,
        label: &'static str,
    }

    impl EchoTool {
        fn named(name: &'static str) -> Self {
            Self { name, label: "" }
        }
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
            let text = arguments["text"]
                .as_str()
                .ok_or_else(|| ToolError::failed(self.name, "missing text"))?;
            Ok(format!("{}{}", self.label, text))
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool::named("echo"))).unwrap();
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn registry_rejects_unnamed_tool() {
        let mut registry = ToolRegistry::new();
        let err = registry.register(Box::new(EchoTool::named("  "))).unwrap_err();
        assert!(matches!(err, ToolError::Registration(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn registry_rejects_padded_name() {
        let mut registry = ToolRegistry::new();
        let err = registry.register(Box::new(EchoTool::named(" calc "))).unwrap_err();
        assert!(matches!(err, ToolError::Registration(ref reason) if reason.contains("whitespace")));
        assert!(registry.is_empty());
        assert!(registry.definitions().is_empty());
    }

    #[test]
    fn definitions_follow_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(Box::new(EchoTool::named(name))).unwrap();
        }
        let names: Vec<_> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
        assert_eq!(registry.names(), ["zeta", "alpha", "mid"]);
    }

    #[tokio::test]
    async fn last_registration_wins_and_keeps_position() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool::named("echo"))).unwrap();
        registry.register(Box::new(EchoTool::named("other"))).unwrap();
        registry
            .register(Box::new(EchoTool {
                name: "echo",
                label: "v2:",
            }))
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), ["echo", "other"]);
        let out = registry
            .execute("echo", serde_json::json!({"text": "hi"}))
            .await
            .unwrap();
        assert_eq!(out, "v2:hi");
    }

    #[tokio::test]
    async fn registry_execute_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool::named("echo"))).unwrap();

        let result = registry
            .execute("echo", serde_json::json!({"text": "hello world"}))
            .await
            .unwrap();
        assert_eq!(result, "hello world");
    }

    #[tokio::test]
    async fn registry_execute_missing_tool() {
        let registry = ToolRegistry::new();
        let err = registry
            .execute("nonexistent", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(ref name) if name == "nonexistent"));
    }

    #[tokio::test]
    async fn execution_failure_propagates_unchanged() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool::named("echo"))).unwrap();
        let err = registry.execute("echo", serde_json::json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "missing text");
    }
}
