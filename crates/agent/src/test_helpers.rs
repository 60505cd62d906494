//! Shared test doubles for orchestrator tests.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use agentchat_core::error::{ProviderError, ToolError};
use agentchat_core::message::{Message, ToolInvocation};
use agentchat_core::provider::{
    ChunkReceiver, Provider, ProviderRequest, ProviderResponse, StreamChunk, Usage,
};
use agentchat_core::tool::Tool;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue and
/// records the request. Panics if more calls are made than responses provided.
pub struct SequentialMockProvider {
    responses: Vec<ProviderResponse>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider that answers once with text.
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    /// A provider that first requests tools, then answers.
    pub fn tool_then_answer(tool_calls: Vec<ToolInvocation>, answer: &str) -> Self {
        Self::new(vec![
            make_tool_call_response(tool_calls),
            make_text_response(answer),
        ])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let n = requests.len();
        let response = self.responses.get(n).cloned().unwrap_or_else(|| {
            panic!(
                "SequentialMockProvider: no more responses (call #{n}, have {})",
                self.responses.len()
            )
        });
        requests.push(request);
        Ok(response)
    }
}

/// A provider whose `stream` replays one scripted round of chunks per call.
pub struct ScriptedStreamProvider {
    rounds: Vec<Vec<Result<StreamChunk, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedStreamProvider {
    pub fn new(rounds: Vec<Vec<StreamChunk>>) -> Self {
        Self::with_results(
            rounds
                .into_iter()
                .map(|round| round.into_iter().map(Ok).collect())
                .collect(),
        )
    }

    pub fn with_results(rounds: Vec<Vec<Result<StreamChunk, ProviderError>>>) -> Self {
        Self {
            rounds,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedStreamProvider {
    fn name(&self) -> &str {
        "scripted_stream"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        panic!("ScriptedStreamProvider only streams")
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        let round = {
            let mut requests = self.requests.lock().unwrap();
            let n = requests.len();
            requests.push(request);
            self.rounds
                .get(n)
                .cloned()
                .unwrap_or_else(|| panic!("ScriptedStreamProvider: no round #{n}"))
        };

        let (tx, rx) = mpsc::channel(round.len().max(1));
        for item in round {
            tx.send(item).await.unwrap();
        }
        Ok(rx)
    }
}

/// A provider that always fails.
pub struct FailingProvider(pub ProviderError);

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(self.0.clone())
    }
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        reasoning: None,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Create a response that requests tools.
pub fn make_tool_call_response(tool_calls: Vec<ToolInvocation>) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_tool_calls(tool_calls),
        reasoning: None,
        usage: None,
        model: "mock-model".into(),
    }
}

/// Helper to create a tool call with id `call_{name}`.
pub fn make_tool_call(name: &str, args: serde_json::Value) -> ToolInvocation {
    ToolInvocation {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

/// Answers `a+b` expressions with `Result: {sum}`.
pub struct CalculatorStub;

#[async_trait]
impl Tool for CalculatorStub {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Adds two numbers"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {"expression": {"type": "string"}},
            "required": ["expression"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let expr = arguments["expression"].as_str().unwrap_or_default();
        let sum: f64 = expr
            .split('+')
            .map(|n| n.trim().parse::<f64>())
            .sum::<Result<f64, _>>()
            .map_err(|_| ToolError::failed("calculator", "Invalid calculation"))?;
        Ok(format!("Result: {sum}"))
    }
}

/// Sleeps, then returns `{name} done`. Counts completions.
pub struct DelayTool {
    name: String,
    delay: Duration,
    pub finished: Arc<AtomicUsize>,
}

impl DelayTool {
    pub fn new(name: &str, delay_ms: u64) -> Self {
        Self {
            name: name.to_string(),
            delay: Duration::from_millis(delay_ms),
            finished: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Tool for DelayTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Waits"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<String, ToolError> {
        tokio::time::sleep(self.delay).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{} done", self.name))
    }
}

/// Always fails with the given reason.
pub struct FailingTool {
    name: String,
    reason: String,
}

impl FailingTool {
    pub fn new(name: &str, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Fails"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<String, ToolError> {
        Err(ToolError::failed(&self.name, &self.reason))
    }
}
