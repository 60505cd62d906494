//! The agentic chat loop.
//!
//! The [`Orchestrator`] follows an **iterate → call → act** cycle:
//!
//! 1. **Receive** a user message
//! 2. **Send to LLM** with the registered tool definitions
//! 3. **If tool calls**: execute them concurrently, append results, loop back to step 2
//! 4. **If text response**: that is the answer
//!
//! In streaming mode, provider deltas pass through the [`DeltaAggregator`],
//! which forwards events to the caller's [`EventSink`](agentchat_core::EventSink)
//! as they arrive and reassembles fragmented tool calls.

pub mod aggregator;
pub mod orchestrator;
pub mod sink;
pub mod user_message;

#[cfg(test)]
mod test_helpers;

pub use aggregator::{AggregatedResponse, DeltaAggregator, PendingToolCall};
pub use orchestrator::{
    DEFAULT_MAX_ITERATIONS, Orchestrator, RunFailure, RunMode, RunOutcome, RunState,
};
pub use sink::{ChannelSink, CollectingSink};
pub use user_message::{ErrorContext, ITERATION_LIMIT_APOLOGY, translate, user_safe_message};
