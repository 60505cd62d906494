//! Delta aggregation for one incremental completion.
//!
//! A [`DeltaAggregator`] is bound to a single completion stream. It reads
//! deltas strictly in arrival order and:
//!
//! - forwards reasoning fragments as `reasoning` events (not accumulated),
//! - assembles tool-call fragments by position index, emitting exactly one
//!   `tool_call` event per index when its name is first seen,
//! - appends content fragments to the full response, emitting `content`
//!   for each one.
//!
//! Argument text is never parsed here. The orchestrator parses it when the
//! tool batch starts, see [`PendingToolCall::parse_arguments`].

use std::collections::BTreeMap;

use agentchat_core::error::{ProviderError, ToolError};
use agentchat_core::event::{EventSink, StreamEvent};
use agentchat_core::message::ToolInvocation;
use agentchat_core::provider::{ChunkReceiver, StreamChunk, Usage};
use tracing::{debug, trace};

/// Invocation id used when the model did not supply one.
pub fn fallback_call_id(index: u32) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("call_{index}_{}", &suffix[..8])
}

/// A tool call under assembly (or fully assembled) at one position index.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingToolCall {
    pub index: u32,
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl PendingToolCall {
    /// Decode the accumulated argument text. Empty text means no arguments.
    pub fn parse_arguments(&self) -> Result<serde_json::Value, ToolError> {
        if self.arguments.trim().is_empty() {
            return Ok(serde_json::json!({}));
        }
        serde_json::from_str(&self.arguments).map_err(|e| ToolError::InvalidArguments {
            tool_name: self.name.clone(),
            reason: e.to_string(),
        })
    }

    /// The history form of this call.
    pub fn into_invocation(self) -> ToolInvocation {
        let arguments = if self.arguments.trim().is_empty() {
            "{}".to_string()
        } else {
            self.arguments
        };
        ToolInvocation {
            id: self.id,
            name: self.name,
            arguments,
        }
    }
}

/// What a completion stream amounted to once it ended.
#[derive(Debug, Clone, Default)]
pub struct AggregatedResponse {
    /// Assembled tool calls, ascending by position index
    pub tool_calls: Vec<PendingToolCall>,

    /// Concatenation of every content fragment, in arrival order
    pub full_response: String,

    /// Last usage report seen on the stream
    pub usage: Option<Usage>,
}

/// Single-use accumulator for one completion stream.
#[derive(Debug, Default)]
pub struct DeltaAggregator {
    calls: BTreeMap<u32, PendingToolCall>,
    full_response: String,
    usage: Option<Usage>,
}

impl DeltaAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one delta into the buffer and return the events it produced,
    /// in emission order: reasoning, tool calls, then content.
    pub fn ingest(&mut self, chunk: StreamChunk) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        if let Some(reasoning) = chunk.reasoning.filter(|r| !r.is_empty()) {
            debug!(reasoning = %reasoning, "Reasoning fragment");
            events.push(StreamEvent::Reasoning { content: reasoning });
        }

        for delta in chunk.tool_calls {
            let entry = self
                .calls
                .entry(delta.index)
                .or_insert_with(|| PendingToolCall {
                    index: delta.index,
                    id: String::new(),
                    name: String::new(),
                    arguments: String::new(),
                });

            // The id is frozen once a tool_call event has announced it
            if let Some(id) = delta.id.filter(|id| !id.is_empty())
                && entry.name.is_empty()
            {
                entry.id = id;
            }

            if let Some(name) = delta.name.filter(|n| !n.is_empty())
                && entry.name.is_empty()
            {
                if entry.id.is_empty() {
                    entry.id = fallback_call_id(delta.index);
                }
                entry.name = name;
                events.push(StreamEvent::ToolCall {
                    tool: entry.name.clone(),
                    id: entry.id.clone(),
                });
            }

            if let Some(fragment) = delta.arguments {
                trace!(index = delta.index, fragment = %fragment, "Argument fragment");
                entry.arguments.push_str(&fragment);
            }
        }

        if let Some(content) = chunk.content.filter(|c| !c.is_empty()) {
            self.full_response.push_str(&content);
            events.push(StreamEvent::Content { content });
        }

        if chunk.usage.is_some() {
            self.usage = chunk.usage;
        }

        events
    }

    /// Drain `rx`, forwarding every event to `sink` as soon as it is produced.
    ///
    /// A provider error mid-stream aborts aggregation; whatever was buffered
    /// is discarded.
    pub async fn consume(
        mut self,
        mut rx: ChunkReceiver,
        sink: &dyn EventSink,
    ) -> Result<AggregatedResponse, ProviderError> {
        while let Some(item) = rx.recv().await {
            for event in self.ingest(item?) {
                sink.emit(event).await;
            }
        }
        Ok(self.finish())
    }

    /// End of stream: hand back the buffer and the full response text.
    pub fn finish(self) -> AggregatedResponse {
        let tool_calls = self
            .calls
            .into_values()
            .map(|mut call| {
                if call.id.is_empty() {
                    call.id = fallback_call_id(call.index);
                }
                call
            })
            .collect();

        AggregatedResponse {
            tool_calls,
            full_response: self.full_response,
            usage: self.usage,
        }
    }
}
