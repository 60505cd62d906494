//! Client side of the agentchat gateway.
//!
//! - [`SseLineDecoder`] turns response bytes into `data:` payloads
//! - [`StreamReducer`] folds [`StreamEvent`](agentchat_core::StreamEvent)s into a
//!   transcript plus two activity logs
//! - [`ChatClient`] drives both against a running gateway

pub mod client;
pub mod reducer;
pub mod sse;

pub use client::{ChatClient, ClientError, DEFAULT_URL};
pub use reducer::{Flow, LogEntry, LogKind, NO_RESPONSE, Speaker, StreamReducer, TranscriptMessage};
pub use sse::SseLineDecoder;
