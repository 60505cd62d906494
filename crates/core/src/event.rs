//! Lifecycle events reported while a chat request runs.
//!
//! `StreamEvent` is the wire-level event: the gateway writes it as an SSE
//! `data:` line or collects it into the JSON response, and the client reduces
//! it into its logs. Within one request, `Done` and `Error` are terminal.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Events emitted by the orchestrator and the delta aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Operational trace line.
    ServerLog { message: String },

    /// Reasoning / thinking text exposed by the model.
    Reasoning { content: String },

    /// The model requested a tool.
    ToolCall { tool: String, id: String },

    /// A tool is about to run with the parsed arguments.
    ToolExecuting { tool: String, args: serde_json::Value },

    /// A tool finished.
    ToolResult {
        tool: String,
        result: String,
        id: String,
    },

    /// A fragment of the answer text.
    Content { content: String },

    /// The run failed; carries a user-safe message.
    Error { error: String },

    /// The run completed.
    Done,
}

impl StreamEvent {
    pub fn server_log(message: impl Into<String>) -> Self {
        Self::ServerLog {
            message: message.into(),
        }
    }

    /// Wire name of this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ServerLog { .. } => "server_log",
            Self::Reasoning { .. } => "reasoning",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolExecuting { .. } => "tool_executing",
            Self::ToolResult { .. } => "tool_result",
            Self::Content { .. } => "content",
            Self::Error { .. } => "error",
            Self::Done => "done",
        }
    }

    /// Whether no further events may follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }
}

/// Destination for lifecycle events.
///
/// Implementations must keep emission order: events are delivered strictly
/// in the order `emit` is called.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: StreamEvent);

    /// Convenience for `ServerLog` events.
    async fn log(&self, message: String) {
        tracing::debug!(target: "agentchat::server_log", "{message}");
        self.emit(StreamEvent::ServerLog { message }).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization_wire_shapes() {
        let json = serde_json::to_value(StreamEvent::server_log("Calling LLM...")).unwrap();
        assert_eq!(json, serde_json::json!({"type": "server_log", "message": "Calling LLM..."}));

        let json = serde_json::to_value(StreamEvent::ToolResult {
            tool: "calculator".into(),
            result: "Result: 4".into(),
            id: "call_1".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "tool_result");
        assert_eq!(json["result"], "Result: 4");
        assert_eq!(json["id"], "call_1");

        let json = serde_json::to_value(StreamEvent::Error {
            error: "boom".into(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"type": "error", "error": "boom"}));

        assert_eq!(
            serde_json::to_string(&StreamEvent::Done).unwrap(),
            r#"{"type":"done"}"#
        );
    }

    #[test]
    fn event_deserialization() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type":"tool_executing","tool":"calculator","args":{"expression":"2+2"}}"#)
                .unwrap();
        match event {
            StreamEvent::ToolExecuting { tool, args } => {
                assert_eq!(tool, "calculator");
                assert_eq!(args["expression"], "2+2");
            }
            other => panic!("Wrong variant: {other:?}"),
        }
    }

    #[test]
    fn event_type_matches_serde_tag() {
        let events = [
            StreamEvent::server_log("x"),
            StreamEvent::Reasoning { content: "x".into() },
            StreamEvent::ToolCall { tool: "t".into(), id: "i".into() },
            StreamEvent::ToolExecuting { tool: "t".into(), args: serde_json::Value::Null },
            StreamEvent::ToolResult { tool: "t".into(), result: "r".into(), id: "i".into() },
            StreamEvent::Content { content: "x".into() },
            StreamEvent::Error { error: "x".into() },
            StreamEvent::Done,
        ];
        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["type"], event.event_type());
        }
    }

    #[test]
    fn only_done_and_error_are_terminal() {
        assert!(StreamEvent::Done.is_terminal());
        assert!(StreamEvent::Error { error: "x".into() }.is_terminal());
        assert!(!StreamEvent::Content { content: "x".into() }.is_terminal());
    }
}
