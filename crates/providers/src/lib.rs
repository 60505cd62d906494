//! Completion client implementations for agentchat.
//!
//! All providers implement the `agentchat_core::Provider` trait.
//! [`build_from_config`] selects the endpoint from configuration.

pub mod factory;
pub mod openai_compat;

pub use factory::{build_from_config, default_base_url, is_local};
pub use openai_compat::OpenAiCompatProvider;
