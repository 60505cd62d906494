//! # agentchat core
//!
//! Domain types, traits, and error definitions for the tool-using chat agent.
//! This crate has **no HTTP dependencies**: it defines the model that
//! the provider, tool, agent, gateway, and client crates implement against.
//!
//! ## Layout
//!
//! - [`message`]: conversation history (`user` / `assistant` / `tool` messages)
//! - [`tool`]: the `Tool` capability and the ordered `ToolRegistry`
//! - [`provider`]: the completion client boundary (single-shot and deltas)
//! - [`event`]: `StreamEvent`, the wire-level lifecycle event, and `EventSink`
//! - [`error`]: the error taxonomy shared by every layer

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, ToolError};
pub use event::{EventSink, StreamEvent};
pub use message::{Conversation, ConversationId, Message, Role, ToolInvocation};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk, ToolCallDelta};
pub use tool::{Tool, ToolRegistry};
