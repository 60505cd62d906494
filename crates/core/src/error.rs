//! Error types for the agentchat domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] wraps them.
//!
//! The `Display` text of these errors is internal. It is logged and used by
//! the agent's translation table, but never shown to the end user verbatim.

use thiserror::Error;

/// The top-level error type for all agentchat operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Request validation ---
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Loop safety valve ---
    #[error("Max iterations reached ({max_iterations})")]
    IterationLimitExceeded { max_iterations: u32 },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of the completion request itself.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures raised by the tool registry or by a tool's own execution.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    NotFound(String),

    #[error("Invalid arguments for {tool_name}: failed to parse: {reason}")]
    InvalidArguments { tool_name: String, reason: String },

    #[error("{reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("{tool_name} timed out after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Invalid tool registration: {0}")]
    Registration(String),
}

impl ToolError {
    /// Shorthand for a tool's own failure.
    pub fn failed(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            tool_name: tool_name.into(),
            reason: reason.into(),
        }
    }

    /// The tool this error is attributed to, when known.
    pub fn tool_name(&self) -> Option<&str> {
        match self {
            Self::NotFound(name) => Some(name),
            Self::InvalidArguments { tool_name, .. }
            | Self::ExecutionFailed { tool_name, .. }
            | Self::Timeout { tool_name, .. } => Some(tool_name),
            Self::Registration(_) => None,
        }
    }
}
