//! Built-in tool implementations for agentchat.
//!
//! Tools give the agent the ability to act: evaluate arithmetic and search
//! the web for values it does not know.

pub mod calculator;
pub mod web_search;

use agentchat_config::SearchConfig;
use agentchat_core::error::ToolError;
use agentchat_core::tool::ToolRegistry;

pub use calculator::CalculatorTool;
pub use web_search::WebSearchTool;

/// Create a tool registry with all built-in tools, in the order their
/// schemas are offered to the model: `calculator`, then `web_search`.
pub fn default_registry(search: &SearchConfig) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(CalculatorTool))?;
    registry.register(Box::new(WebSearchTool::from_config(search)?))?;
    Ok(registry)
}
