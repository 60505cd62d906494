//! `POST /chat`: one user message in, one agent run out.
//!
//! Request body: `{ "query" | "message": string, "stream"?: bool }`.
//!
//! - `stream: true` answers with `text/event-stream`, one `data: <event>`
//!   frame per [`StreamEvent`], ending with `done` or `error`.
//! - otherwise the run is collected and answered as
//!   `{ response, logs, aiEvents }`.

use std::convert::Infallible;

use agentchat_agent::{ChannelSink, CollectingSink, RunMode};
use agentchat_core::error::Error;
use agentchat_core::event::{EventSink, StreamEvent};
use async_trait::async_trait;
use axum::{
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::sse::{Event as SseEvent, Sse},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::SharedState;

/// Outbound event buffer per streaming request.
const STREAM_BUFFER: usize = 64;

const INVALID_REQUEST: &str = "Invalid \"query\" or \"message\" in request body";
const NO_RESPONSE: &str = "Sorry, I didn't receive a response. Please try again.";
const REQUEST_RECEIVED: &str = "New chat request received";
const REQUEST_COMPLETED: &str = "Request completed successfully";

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub logs: Vec<String>,
    #[serde(rename = "aiEvents")]
    pub ai_events: Vec<StreamEvent>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<String>>,
}

/// A validated chat request.
#[derive(Debug)]
struct ChatRequest {
    text: String,
    stream: bool,
}

impl ChatRequest {
    /// `query` wins if it is a non-empty string, else `message`.
    fn from_body(body: &serde_json::Value) -> Result<Self, Error> {
        let text = ["query", "message"]
            .into_iter()
            .find_map(|key| body.get(key).and_then(|v| v.as_str()).filter(|s| !s.is_empty()))
            .ok_or_else(|| Error::InvalidRequest(INVALID_REQUEST.into()))?;

        Ok(Self {
            text: text.to_string(),
            stream: body.get("stream").and_then(|v| v.as_bool()).unwrap_or(false),
        })
    }
}

fn bad_request(error: Error) -> Response {
    let error = match error {
        Error::InvalidRequest(reason) => reason,
        other => other.to_string(),
    };
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse { error, logs: None }),
    )
        .into_response()
}

pub async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Response {
    let parsed = match payload {
        Ok(Json(body)) => ChatRequest::from_body(&body),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return rejection.into_response();
        }
        Err(rejection) => {
            warn!(error = %rejection, "Rejected chat body");
            Err(Error::InvalidRequest(INVALID_REQUEST.into()))
        }
    };

    let request = match parsed {
        Ok(request) => request,
        Err(e) => return bad_request(e),
    };

    info!(stream = request.stream, "New chat request received");

    if request.stream {
        stream_chat(state, request.text).await.into_response()
    } else {
        collect_chat(state, &request.text).await
    }
}

/// Forwards to the channel, announcing success just before `done`.
struct GatewaySink {
    inner: ChannelSink,
}

#[async_trait]
impl EventSink for GatewaySink {
    async fn emit(&self, event: StreamEvent) {
        if event == StreamEvent::Done {
            info!("Request completed successfully");
            self.inner.emit(StreamEvent::server_log(REQUEST_COMPLETED)).await;
        }
        self.inner.emit(event).await;
    }
}

async fn stream_chat(
    state: SharedState,
    text: String,
) -> Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>> {
    let (inner, rx) = ChannelSink::channel(STREAM_BUFFER);
    let sink = GatewaySink { inner };

    sink.log(REQUEST_RECEIVED.into()).await;

    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        // The error event has already been written to the stream
        if let Err(failure) = orchestrator.run(&text, RunMode::Streaming, &sink).await {
            warn!(error = %failure.source, state = ?failure.state, "Request failed");
        }
    });

    let stream = ReceiverStream::new(rx).map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(SseEvent::default().data(data))
    });

    Sse::new(stream)
}

async fn collect_chat(state: SharedState, text: &str) -> Response {
    let sink = CollectingSink::new();
    sink.log(REQUEST_RECEIVED.into()).await;

    match state.orchestrator.run(text, RunMode::SingleShot, &sink).await {
        Ok(outcome) => {
            info!(iterations = outcome.iterations, "Request completed successfully");
            sink.log(REQUEST_COMPLETED.into()).await;

            let mut ai_events = sink.ai_events();
            ai_events.push(StreamEvent::Done);

            let response = if outcome.answer.is_empty() {
                NO_RESPONSE.to_string()
            } else {
                outcome.answer
            };

            Json(ChatResponse {
                response,
                logs: sink.logs(),
                ai_events,
            })
            .into_response()
        }
        Err(failure) => {
            warn!(error = %failure.source, state = ?failure.state, "Request failed");

            let mut logs = sink.logs();
            logs.push(format!("Request failed: {}", failure.user_message));

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: failure.user_message,
                    logs: Some(logs),
                }),
            )
                .into_response()
        }
    }
}
