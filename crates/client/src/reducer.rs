//! Folds a run's events into what a chat UI shows.
//!
//! Three views are kept:
//!
//! - **transcript**: user and assistant messages; only `content` events grow
//!   the trailing assistant message
//! - **AI activity**: tool calls, tool results, reasoning and content
//! - **server log**: `server_log` lines and terminal outcomes

use agentchat_core::event::StreamEvent;
use serde::Serialize;
use tracing::warn;

/// Shown when a run ends without content and without an error.
pub const NO_RESPONSE: &str = "Sorry, I didn't receive a response. Please try again.";

const EXECUTING_ARGS_CHARS: usize = 80;
const RESULT_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    ToolCall,
    ToolExecuting,
    ToolResult,
    Reasoning,
    Content,
    Done,
    Error,
    Server,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Local wall-clock time, `HH:MM:SS`
    pub timestamp: String,
    pub kind: LogKind,
    pub message: String,
}

impl LogEntry {
    fn now(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptMessage {
    pub speaker: Speaker,
    pub content: String,
}

/// Whether the reader should keep consuming events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

#[derive(Debug, Default)]
pub struct StreamReducer {
    transcript: Vec<TranscriptMessage>,
    ai_activity: Vec<LogEntry>,
    server_log: Vec<LogEntry>,
    /// Content received in the current turn
    answer: String,
    errored: bool,
}

impl StreamReducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &[TranscriptMessage] {
        &self.transcript
    }

    pub fn ai_activity(&self) -> &[LogEntry] {
        &self.ai_activity
    }

    pub fn server_log(&self) -> &[LogEntry] {
        &self.server_log
    }

    /// Content received so far in the current turn.
    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn errored(&self) -> bool {
        self.errored
    }

    /// Start a new turn: record the user's message and reset both logs.
    pub fn begin_turn(&mut self, user_text: &str) {
        self.transcript.push(TranscriptMessage {
            speaker: Speaker::User,
            content: user_text.to_string(),
        });
        self.ai_activity.clear();
        self.server_log.clear();
        self.answer.clear();
        self.errored = false;
    }

    /// Decode one `data:` payload, show it to `observe`, then apply it.
    /// Undecodable payloads are logged and skipped.
    pub fn apply_payload(&mut self, data: &str, mut observe: impl FnMut(&StreamEvent)) -> Flow {
        match serde_json::from_str::<StreamEvent>(data) {
            Ok(event) => {
                observe(&event);
                self.apply(&event)
            }
            Err(e) => {
                warn!(error = %e, raw = %data, "Failed to parse SSE data");
                Flow::Continue
            }
        }
    }

    /// Apply one live event. Returns [`Flow::Stop`] on `done` or `error`.
    pub fn apply(&mut self, event: &StreamEvent) -> Flow {
        match event {
            StreamEvent::Content { content } => {
                self.answer.push_str(content);
                self.extend_assistant(content);
                self.record(event);
                Flow::Continue
            }
            StreamEvent::Error { error } => {
                self.show_error(error);
                Flow::Stop
            }
            StreamEvent::Done => {
                self.record(event);
                Flow::Stop
            }
            _ => {
                self.record(event);
                Flow::Continue
            }
        }
    }

    /// Route an event to the logs without touching the transcript.
    pub fn record(&mut self, event: &StreamEvent) {
        let (kind, message) = match event {
            StreamEvent::ServerLog { message } => (LogKind::Server, message.clone()),
            StreamEvent::ToolCall { tool, .. } => (LogKind::ToolCall, tool.clone()),
            StreamEvent::ToolExecuting { tool, args } => {
                let args = args.to_string();
                (
                    LogKind::ToolExecuting,
                    format!("{tool}({}...)", truncate(&args, EXECUTING_ARGS_CHARS)),
                )
            }
            StreamEvent::ToolResult { result, .. } => {
                let cut = truncate(result, RESULT_CHARS);
                let marker = if cut.chars().count() >= RESULT_CHARS { "..." } else { "" };
                (LogKind::ToolResult, format!("{cut}{marker}"))
            }
            StreamEvent::Reasoning { content } => (LogKind::Reasoning, content.clone()),
            StreamEvent::Content { content } => (LogKind::Content, content.clone()),
            StreamEvent::Done => (LogKind::Done, "Stream completed".to_string()),
            StreamEvent::Error { error } => (LogKind::Error, error.clone()),
        };

        let entry = LogEntry::now(kind, message);
        match kind {
            LogKind::Server | LogKind::Done | LogKind::Error => self.server_log.push(entry),
            _ => self.ai_activity.push(entry),
        }
    }

    /// Surface a run error in the transcript and the server log.
    pub fn show_error(&mut self, message: &str) {
        self.errored = true;
        self.set_assistant(format!(
            "Sorry, something went wrong: {message}. Please try again or rephrase your question."
        ));
        self.server_log.push(LogEntry::now(LogKind::Error, message));
    }

    /// Surface a transport failure (connection refused, bad status).
    pub fn show_request_error(&mut self, description: &str) {
        self.errored = true;
        self.set_assistant(format!("Sorry, {description}. Please try again."));
        self.server_log.push(LogEntry::now(LogKind::Error, description));
    }

    /// Set the whole answer at once (non-incremental responses).
    pub fn complete_with(&mut self, response: &str) {
        self.answer = response.to_string();
        let text = if response.is_empty() { NO_RESPONSE } else { response };
        self.set_assistant(text.to_string());
    }

    /// End of stream: fall back if nothing was produced.
    pub fn finish(&mut self) {
        if self.answer.is_empty() && !self.errored {
            self.set_assistant(NO_RESPONSE.to_string());
        }
    }

    /// Grow the trailing assistant message, appending one if needed.
    fn extend_assistant(&mut self, fragment: &str) {
        match self.transcript.last_mut() {
            Some(last) if last.speaker == Speaker::Assistant => last.content.push_str(fragment),
            _ => self.transcript.push(TranscriptMessage {
                speaker: Speaker::Assistant,
                content: fragment.to_string(),
            }),
        }
    }

    /// Replace the trailing assistant message, appending one if needed.
    fn set_assistant(&mut self, content: String) {
        match self.transcript.last_mut() {
            Some(last) if last.speaker == Speaker::Assistant => last.content = content,
            _ => self.transcript.push(TranscriptMessage {
                speaker: Speaker::Assistant,
                content,
            }),
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((cut, _)) => &s[..cut],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(text: &str) -> StreamEvent {
        StreamEvent::Content {
            content: text.into(),
        }
    }

    #[test]
    fn tool_round_then_content() {
        let mut reducer = StreamReducer::new();
        reducer.begin_turn("what is 2+2?");

        let events = [
            StreamEvent::ToolCall {
                tool: "calculator".into(),
                id: "call_1".into(),
            },
            StreamEvent::ToolExecuting {
                tool: "calculator".into(),
                args: serde_json::json!({"expression": "2+2"}),
            },
            StreamEvent::ToolResult {
                tool: "calculator".into(),
                result: "Result: 4".into(),
                id: "call_1".into(),
            },
            content("The "),
            content("answer "),
            content("is 4."),
            StreamEvent::Done,
        ];

        let flows: Vec<_> = events.iter().map(|e| reducer.apply(e)).collect();
        assert_eq!(flows.last(), Some(&Flow::Stop));
        assert!(flows[..6].iter().all(|f| *f == Flow::Continue));

        assert_eq!(reducer.ai_activity().len(), 6);
        assert_eq!(reducer.server_log().len(), 1);
        assert_eq!(reducer.server_log()[0].kind, LogKind::Done);

        let assistant: Vec<_> = reducer
            .transcript()
            .iter()
            .filter(|m| m.speaker == Speaker::Assistant)
            .collect();
        assert_eq!(assistant.len(), 1);
        assert_eq!(assistant[0].content, "The answer is 4.");
    }

    #[test]
    fn log_messages_are_formatted() {
        let mut reducer = StreamReducer::new();
        reducer.begin_turn("q");
        reducer.apply(&StreamEvent::ToolExecuting {
            tool: "web_search".into(),
            args: serde_json::json!({"query": "rust"}),
        });
        reducer.apply(&StreamEvent::ToolResult {
            tool: "web_search".into(),
            result: "x".repeat(150),
            id: "call_1".into(),
        });
        reducer.apply(&StreamEvent::ToolResult {
            tool: "calculator".into(),
            result: "Result: 4".into(),
            id: "call_2".into(),
        });

        let messages: Vec<_> = reducer.ai_activity().iter().map(|e| e.message.clone()).collect();
        assert_eq!(messages[0], r#"web_search({"query":"rust"}...)"#);
        assert_eq!(messages[1], format!("{}...", "x".repeat(100)));
        assert_eq!(messages[2], "Result: 4");

        let ts = &reducer.ai_activity()[0].timestamp;
        assert_eq!(ts.len(), 8);
        assert_eq!(ts.as_bytes()[2], b':');
    }

    #[test]
    fn error_stops_and_replaces_answer() {
        let mut reducer = StreamReducer::new();
        reducer.begin_turn("q");
        reducer.apply(&StreamEvent::server_log("Calling LLM..."));
        reducer.apply(&content("partial"));

        let flow = reducer.apply(&StreamEvent::Error {
            error: "The request timed out".into(),
        });
        assert_eq!(flow, Flow::Stop);
        reducer.finish();

        assert!(reducer.errored());
        assert_eq!(
            reducer.transcript().last().unwrap().content,
            "Sorry, something went wrong: The request timed out. Please try again or rephrase your question."
        );
        let errors = reducer
            .server_log()
            .iter()
            .filter(|e| e.kind == LogKind::Error)
            .count();
        assert_eq!(errors, 1);
        assert_eq!(reducer.server_log()[0].kind, LogKind::Server);
    }

    #[test]
    fn empty_stream_falls_back() {
        let mut reducer = StreamReducer::new();
        reducer.begin_turn("hello");
        reducer.apply(&StreamEvent::Done);
        reducer.finish();

        assert_eq!(reducer.transcript().len(), 2);
        assert_eq!(reducer.transcript()[1].content, NO_RESPONSE);
    }

    #[test]
    fn bad_payload_is_skipped() {
        let mut reducer = StreamReducer::new();
        reducer.begin_turn("q");
        assert_eq!(reducer.apply_payload("{not json", |_| {}), Flow::Continue);
        assert_eq!(
            reducer.apply_payload(r#"{"type":"content","content":"ok"}"#, |_| {}),
            Flow::Continue
        );
        assert_eq!(reducer.answer(), "ok");
    }

    #[test]
    fn observer_sees_decoded_events_only() {
        let mut reducer = StreamReducer::new();
        reducer.begin_turn("q");
        let mut seen = Vec::new();
        reducer.apply_payload("{not json", |e| seen.push(e.clone()));
        reducer.apply_payload(r#"{"type":"done"}"#, |e| seen.push(e.clone()));
        assert_eq!(seen, [StreamEvent::Done]);
    }

    #[test]
    fn content_grows_one_assistant_message_per_turn() {
        let mut reducer = StreamReducer::new();
        for turn in ["first", "second"] {
            reducer.begin_turn(turn);
            for _ in 0..500 {
                reducer.apply(&StreamEvent::Content {
                    content: "ab".into(),
                });
            }
        }

        let transcript = reducer.transcript();
        assert_eq!(transcript.len(), 4);
        assert_eq!(transcript[1].content, "ab".repeat(500));
        assert_eq!(transcript[3].speaker, Speaker::Assistant);
        assert_eq!(transcript[3].content, reducer.answer());
    }

    #[test]
    fn new_turn_resets_logs_but_keeps_transcript() {
        let mut reducer = StreamReducer::new();
        reducer.begin_turn("one");
        reducer.apply(&content("first"));
        reducer.apply(&StreamEvent::Done);

        reducer.begin_turn("two");
        assert!(reducer.ai_activity().is_empty());
        assert!(reducer.server_log().is_empty());
        assert_eq!(reducer.answer(), "");

        reducer.apply(&content("second"));
        let contents: Vec<_> = reducer.transcript().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["one", "first", "two", "second"]);
    }
}
