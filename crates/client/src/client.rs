//! HTTP client for `POST /chat`.

use agentchat_core::event::StreamEvent;
use futures::StreamExt;
use serde::Deserialize;
use tracing::debug;

use crate::reducer::{Flow, StreamReducer};
use crate::sse::SseLineDecoder;

/// Default gateway endpoint.
pub const DEFAULT_URL: &str = "http://localhost:8081/chat";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error! status: {0}")]
    Status(u16),

    #[error("Failed to connect to server at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Error reading stream: {0}")]
    Stream(#[source] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Body(#[source] reqwest::Error),
}

/// Body of a non-streaming reply, success or failure.
#[derive(Debug, Default, Deserialize)]
struct ChatReply {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    logs: Vec<String>,
    #[serde(default, rename = "aiEvents")]
    ai_events: Vec<StreamEvent>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    url: String,
}

impl ChatClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, message: &str, stream: bool) -> Result<reqwest::Response, ClientError> {
        let response = self
            .http
            .post(&self.url)
            .json(&serde_json::json!({ "message": message, "stream": stream }))
            .send()
            .await
            .map_err(|source| ClientError::Connect {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }
        Ok(response)
    }

    /// Send one message and fold the SSE reply into `reducer`.
    ///
    /// `on_event` sees every decoded event before it is applied.
    pub async fn stream_chat(
        &self,
        message: &str,
        reducer: &mut StreamReducer,
        mut on_event: impl FnMut(&StreamEvent),
    ) -> Result<(), ClientError> {
        reducer.begin_turn(message);

        let result = self.read_stream(message, reducer, &mut on_event).await;
        match &result {
            Ok(()) => reducer.finish(),
            Err(e) => reducer.show_request_error(&e.to_string()),
        }
        result
    }

    async fn read_stream(
        &self,
        message: &str,
        reducer: &mut StreamReducer,
        on_event: &mut impl FnMut(&StreamEvent),
    ) -> Result<(), ClientError> {
        let response = self.post(message, true).await?;
        let mut body = response.bytes_stream();
        let mut decoder = SseLineDecoder::new();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(ClientError::Stream)?;
            for data in decoder.push(&chunk) {
                if reducer.apply_payload(&data, &mut *on_event) == Flow::Stop {
                    debug!("Terminal event received");
                    return Ok(());
                }
            }
        }

        if let Some(data) = decoder.finish() {
            reducer.apply_payload(&data, &mut *on_event);
        }
        Ok(())
    }

    /// Send one message without streaming and replay the collected reply.
    pub async fn chat(&self, message: &str, reducer: &mut StreamReducer) -> Result<(), ClientError> {
        reducer.begin_turn(message);

        let reply = match self.fetch_reply(message).await {
            Ok(reply) => reply,
            Err(e) => {
                reducer.show_request_error(&e.to_string());
                return Err(e);
            }
        };

        for line in &reply.logs {
            reducer.record(&StreamEvent::server_log(line.as_str()));
        }
        for event in &reply.ai_events {
            reducer.record(event);
        }

        match reply.error {
            Some(error) => reducer.show_error(&error),
            None => reducer.complete_with(reply.response.as_deref().unwrap_or_default()),
        }
        Ok(())
    }

    async fn fetch_reply(&self, message: &str) -> Result<ChatReply, ClientError> {
        self.post(message, false)
            .await?
            .json::<ChatReply>()
            .await
            .map_err(ClientError::Body)
    }
}
