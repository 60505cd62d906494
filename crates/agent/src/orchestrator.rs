//! The bounded iterate-call-act loop.
//!
//! One [`Orchestrator::run`] serves one user request:
//!
//! 1. Seed a one-message history with the user's text.
//! 2. Ask the provider for a completion (single-shot or incremental).
//! 3. If the model requested tools, execute them concurrently, append the
//!    requests and their results to history, and loop.
//! 4. Otherwise the model's text is the answer.
//!
//! Every step is reported through the [`EventSink`]. The loop is bounded by
//! `max_iterations`; reaching the bound is a user-visible failure.

use std::sync::Arc;

use agentchat_config::AppConfig;
use agentchat_core::error::{Error, ToolError};
use agentchat_core::event::{EventSink, StreamEvent};
use agentchat_core::message::{Conversation, Message, ToolInvocation};
use agentchat_core::provider::{Provider, ProviderRequest, ToolDefinition};
use agentchat_core::tool::ToolRegistry;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::aggregator::{DeltaAggregator, PendingToolCall, fallback_call_id};
use crate::user_message::{self, ITERATION_LIMIT_APOLOGY};

/// Default cap on loop iterations per request.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Characters of a tool result echoed into the operational trace.
const RESULT_PREVIEW_CHARS: usize = 200;

/// How completions are requested for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Incremental deltas, forwarded to the sink as they arrive.
    Streaming,
    /// One complete message per iteration.
    SingleShot,
}

/// Lifecycle of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Iterating,
    Completed,
    IterationLimitExceeded,
    Failed,
}

/// A run that ended with an answer.
#[derive(Debug)]
pub struct RunOutcome {
    /// The model's final text, exactly as received
    pub answer: String,

    /// Completion calls made
    pub iterations: u32,

    /// The history the run built, ending with the answer
    pub conversation: Conversation,
}

/// A run that ended without an answer.
#[derive(Debug, thiserror::Error)]
#[error("{user_message}")]
pub struct RunFailure {
    /// `Failed` or `IterationLimitExceeded`
    pub state: RunState,

    /// Iteration in which the run ended
    pub iterations: u32,

    /// Sentence safe to show the end user
    pub user_message: String,

    #[source]
    pub source: Error,
}

/// Drives the loop. Holds no per-run state; concurrent runs are independent.
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    max_iterations: u32,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            tools,
            model: model.into(),
            temperature: None,
            max_tokens: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Build from application config: model, sampling, and iteration cap.
    pub fn from_config(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        config: &AppConfig,
    ) -> Self {
        let mut orchestrator = Self::new(provider, tools, &config.model)
            .with_max_iterations(config.agent.max_iterations);
        orchestrator.temperature = config.temperature;
        orchestrator.max_tokens = config.max_tokens;
        orchestrator
    }

    /// Set the maximum number of loop iterations (at least 1).
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Answer one user message.
    pub async fn run(
        &self,
        user_text: &str,
        mode: RunMode,
        sink: &dyn EventSink,
    ) -> Result<RunOutcome, RunFailure> {
        Run {
            orchestrator: self,
            mode,
            sink,
            definitions: self.tools.definitions(),
            conversation: Conversation::with_user_message(user_text),
            iteration: 0,
            state: RunState::Idle,
        }
        .drive(user_text)
        .await
    }
}

/// What one iteration decided.
enum Step {
    Continue,
    Answer(String),
}

/// Private state of a single run.
struct Run<'a> {
    orchestrator: &'a Orchestrator,
    mode: RunMode,
    sink: &'a dyn EventSink,
    definitions: Vec<ToolDefinition>,
    conversation: Conversation,
    iteration: u32,
    state: RunState,
}

impl Run<'_> {
    fn transition(&mut self, next: RunState) {
        debug!(from = ?self.state, to = ?next, iteration = self.iteration, "Run state");
        self.state = next;
    }

    async fn log(&self, message: impl Into<String>) {
        self.sink.log(message.into()).await;
    }

    async fn drive(mut self, user_text: &str) -> Result<RunOutcome, RunFailure> {
        let max = self.orchestrator.max_iterations;

        info!(conversation_id = %self.conversation.id, mode = ?self.mode, "Starting agentic chat loop");
        self.log("Starting agentic chat loop...").await;
        self.log(format!("User message: {user_text}")).await;
        self.transition(RunState::Iterating);

        loop {
            if self.iteration >= max {
                return Err(self.limit_exceeded().await);
            }
            self.iteration += 1;

            debug!(iteration = self.iteration, max, "Agent loop iteration");
            self.log(format!("Iteration {}/{max}", self.iteration)).await;
            self.log("Calling LLM...").await;

            let step = match self.mode {
                RunMode::Streaming => self.streaming_step().await,
                RunMode::SingleShot => self.single_shot_step().await,
            };

            match step {
                Ok(Step::Continue) => continue,
                Ok(Step::Answer(answer)) => {
                    self.transition(RunState::Completed);
                    self.conversation.push(Message::assistant(answer.clone()));
                    return Ok(RunOutcome {
                        answer,
                        iterations: self.iteration,
                        conversation: self.conversation,
                    });
                }
                Err(error) => return Err(self.fail(error).await),
            }
        }
    }

    fn request(&self) -> ProviderRequest {
        ProviderRequest {
            model: self.orchestrator.model.clone(),
            messages: self.conversation.messages.clone(),
            tools: self.definitions.clone(),
            temperature: self.orchestrator.temperature,
            max_tokens: self.orchestrator.max_tokens,
            stream: self.mode == RunMode::Streaming,
        }
    }

    async fn streaming_step(&mut self) -> Result<Step, Error> {
        let rx = self.orchestrator.provider.stream(self.request()).await?;
        let aggregated = DeltaAggregator::new().consume(rx, self.sink).await?;

        if let Some(usage) = &aggregated.usage {
            debug!(total_tokens = usage.total_tokens, "Completion usage");
        }

        if aggregated.tool_calls.is_empty() {
            info!(iteration = self.iteration, "Stream completed successfully");
            self.log("Stream completed successfully").await;
            self.sink.emit(StreamEvent::Done).await;
            return Ok(Step::Answer(aggregated.full_response));
        }

        self.log("LLM requested tool calls").await;
        ensure_named(&aggregated.tool_calls)?;
        self.tool_round(aggregated.tool_calls).await?;
        Ok(Step::Continue)
    }

    async fn single_shot_step(&mut self) -> Result<Step, Error> {
        let response = self.orchestrator.provider.complete(self.request()).await?;

        if let Some(reasoning) = response.reasoning.filter(|r| !r.is_empty()) {
            self.log(format!("Reasoning: {reasoning}")).await;
            self.sink
                .emit(StreamEvent::Reasoning { content: reasoning })
                .await;
        }

        let calls = response.message.tool_calls();
        if calls.is_empty() {
            let answer = response.message.text().unwrap_or_default().to_string();
            if !answer.is_empty() {
                self.sink
                    .emit(StreamEvent::Content {
                        content: answer.clone(),
                    })
                    .await;
            }
            info!(iteration = self.iteration, "LLM provided direct response");
            self.log("LLM provided direct response (no tools needed)").await;
            return Ok(Step::Answer(answer));
        }

        self.log("LLM requested tool calls").await;
        let pending: Vec<PendingToolCall> = calls
            .iter()
            .zip(0u32..)
            .map(|(call, index)| PendingToolCall {
                index,
                id: if call.id.is_empty() {
                    fallback_call_id(index)
                } else {
                    call.id.clone()
                },
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            })
            .collect();
        ensure_named(&pending)?;

        for call in &pending {
            self.sink
                .emit(StreamEvent::ToolCall {
                    tool: call.name.clone(),
                    id: call.id.clone(),
                })
                .await;
        }

        self.tool_round(pending).await?;
        Ok(Step::Continue)
    }

    /// Execute one batch and append it to history.
    async fn tool_round(&mut self, calls: Vec<PendingToolCall>) -> Result<(), Error> {
        let results = self.execute_batch(calls).await?;
        self.conversation.push_tool_round(results);
        self.log("Continuing loop with tool results...").await;
        Ok(())
    }

    /// Run every call concurrently. All calls settle before the outcome is
    /// decided; the first failure in request order fails the batch.
    async fn execute_batch(
        &self,
        calls: Vec<PendingToolCall>,
    ) -> Result<Vec<(ToolInvocation, String)>, ToolError> {
        debug!(count = calls.len(), "Executing tool batch");

        let settled = join_all(calls.iter().map(|call| self.execute_one(call))).await;

        let mut results = Vec::with_capacity(calls.len());
        for (call, outcome) in calls.into_iter().zip(settled) {
            let output = outcome?;
            results.push((call.into_invocation(), output));
        }
        Ok(results)
    }

    async fn execute_one(&self, call: &PendingToolCall) -> Result<String, ToolError> {
        let args = call.parse_arguments()?;

        self.log(format!("Executing {} with args: {args}", call.name))
            .await;
        self.sink
            .emit(StreamEvent::ToolExecuting {
                tool: call.name.clone(),
                args: args.clone(),
            })
            .await;

        let output = match self.orchestrator.tools.execute(&call.name, args).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                return Err(e);
            }
        };

        self.log(format!("{} executed successfully", call.name)).await;
        self.log(format!("Result: {}", preview(&output))).await;
        self.sink
            .emit(StreamEvent::ToolResult {
                tool: call.name.clone(),
                result: output.clone(),
                id: call.id.clone(),
            })
            .await;

        Ok(output)
    }

    async fn fail(mut self, error: Error) -> RunFailure {
        warn!(iteration = self.iteration, error = %error, "Run failed");
        self.log(format!("Error in iteration {}: {error}", self.iteration))
            .await;

        let user_message = user_message::translate(&error).to_string();
        if self.mode == RunMode::Streaming {
            self.sink
                .emit(StreamEvent::Error {
                    error: user_message.clone(),
                })
                .await;
        }

        self.transition(RunState::Failed);
        RunFailure {
            state: self.state,
            iterations: self.iteration,
            user_message,
            source: error,
        }
    }

    async fn limit_exceeded(mut self) -> RunFailure {
        let max_iterations = self.orchestrator.max_iterations;
        warn!(max_iterations, "Max iterations reached");
        self.log("Max iterations reached").await;

        if self.mode == RunMode::Streaming {
            self.sink
                .emit(StreamEvent::Error {
                    error: ITERATION_LIMIT_APOLOGY.into(),
                })
                .await;
        }

        self.transition(RunState::IterationLimitExceeded);
        RunFailure {
            state: self.state,
            iterations: self.iteration,
            user_message: ITERATION_LIMIT_APOLOGY.into(),
            source: Error::IterationLimitExceeded { max_iterations },
        }
    }
}

/// A call whose name never arrived cannot be announced or executed.
fn ensure_named(calls: &[PendingToolCall]) -> Result<(), ToolError> {
    match calls.iter().find(|call| call.name.trim().is_empty()) {
        Some(call) => Err(ToolError::NotFound(format!("<unnamed call {}>", call.id))),
        None => Ok(()),
    }
}

/// First characters of a tool result, marked when cut.
fn preview(output: &str) -> String {
    match output.char_indices().nth(RESULT_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &output[..cut]),
        None => output.to_string(),
    }
}
