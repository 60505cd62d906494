//! Concrete event sinks.
//!
//! [`ChannelSink`] feeds an mpsc channel that the gateway turns into an SSE
//! response. [`CollectingSink`] keeps everything in memory so a synchronous
//! JSON response can be assembled after the run.

use std::sync::Mutex;

use agentchat_core::event::{EventSink, StreamEvent};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::trace;

/// Writes events into a bounded channel, in emission order.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<StreamEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink together with the receiving end.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn emit(&self, event: StreamEvent) {
        if self.tx.send(event).await.is_err() {
            trace!("Event receiver dropped; discarding event");
        }
    }
}

/// Records every event for later assembly.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<StreamEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events in emission order.
    pub fn events(&self) -> Vec<StreamEvent> {
        self.lock().clone()
    }

    /// Messages of the `server_log` events, in order.
    pub fn logs(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                StreamEvent::ServerLog { message } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// Every event except `server_log`, in order.
    pub fn ai_events(&self) -> Vec<StreamEvent> {
        self.lock()
            .iter()
            .filter(|e| !matches!(e, StreamEvent::ServerLog { .. }))
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<StreamEvent>> {
        // A poisoned lock still holds a consistent Vec
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl EventSink for CollectingSink {
    async fn emit(&self, event: StreamEvent) {
        self.lock().push(event);
    }
}
