//! Conversation orchestrator - the tool-calling loop
//!
//! One chat request runs as a lazy stream of `ChatEvent`s:
//!
//! ```text
//! seed (system, history window, user)
//!   → thinking → model call ─┬─ tool calls → tool_start / tool_result / artifact → loop
//!                            └─ plain reply → response → done
//!   ceiling reached → done{maxReached}
//!   backend failure → error
//! ```

use std::sync::Arc;
use std::time::Instant;

use async_stream::stream;
use futures_util::Stream;
use serde_json::{json, Value};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use super::events::ChatEvent;
use super::prompt::DEFAULT_SYSTEM_PROMPT;
use crate::config::ReasoningConfig;
use crate::llm::chat::{ChatMessage, ReasoningBackend};
use crate::metrics::{AGENT_ITERATIONS, CHAT_REQUESTS, LLM_CALL_DURATION};
use crate::tools::{failure, parse_raw_arguments, ToolExecutor};

/// Configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum number of model calls per request
    pub max_iterations: usize,
    /// Number of caller-supplied prior turns kept
    pub history_window: usize,
    /// Custom system prompt (uses default if None)
    pub system_prompt: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            history_window: 10,
            system_prompt: None,
        }
    }
}

impl From<&ReasoningConfig> for OrchestratorConfig {
    fn from(config: &ReasoningConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            history_window: config.history_window,
            system_prompt: None,
        }
    }
}

/// Drives the model ↔ tool loop for chat requests
#[derive(Clone)]
pub struct Orchestrator {
    backend: Arc<dyn ReasoningBackend>,
    tools: Arc<dyn ToolExecutor>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        backend: Arc<dyn ReasoningBackend>,
        tools: Arc<dyn ToolExecutor>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            backend,
            tools,
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Initial conversation: system prompt, trailing history window, new message
    ///
    /// Only plain user/assistant turns with text are accepted from callers.
    pub fn seed_messages(&self, message: &str, history: &[ChatMessage]) -> Vec<ChatMessage> {
        let system_prompt = self
            .config
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        let accepted: Vec<&ChatMessage> = history
            .iter()
            .filter(|m| (m.role == "user" || m.role == "assistant") && !m.text().is_empty())
            .collect();
        let skip = accepted.len().saturating_sub(self.config.history_window);

        let mut messages = Vec::with_capacity(self.config.history_window + 2);
        messages.push(ChatMessage::system(system_prompt));
        for turn in accepted.into_iter().skip(skip) {
            if turn.role == "user" {
                messages.push(ChatMessage::user(turn.text()));
            } else {
                messages.push(ChatMessage::assistant(turn.text()));
            }
        }
        messages.push(ChatMessage::user(message));
        messages
    }

    /// Run one chat request as a finite event stream
    ///
    /// The stream always ends with exactly one `done` or `error` event.
    pub fn run(
        &self,
        message: String,
        history: Vec<ChatMessage>,
    ) -> impl Stream<Item = ChatEvent> + Send + 'static {
        let backend = self.backend.clone();
        let tools = self.tools.clone();
        let max_iterations = self.config.max_iterations;
        let mut messages = self.seed_messages(&message, &history);
        let trace_id = Uuid::now_v7().to_string();

        stream! {
            let model = backend.model().to_string();
            info!(trace_id = %trace_id, model = %model, history = history.len(), "Starting chat request");

            let mut iteration = 0usize;
            loop {
                if iteration >= max_iterations {
                    warn!(trace_id = %trace_id, iterations = iteration, "Max iterations reached");
                    CHAT_REQUESTS.with_label_values(&["max_iterations"]).inc();
                    AGENT_ITERATIONS.observe(iteration as f64);
                    yield ChatEvent::Done { iterations: iteration, max_reached: Some(true) };
                    break;
                }

                iteration += 1;
                yield ChatEvent::Thinking { iteration };

                let llm_span = info_span!(
                    "llm_call",
                    trace_id = %trace_id,
                    iteration,
                    model = %model,
                    otel.name = "llm_call"
                );
                let call_start = Instant::now();
                let reply = backend
                    .complete(&messages, tools.definitions())
                    .instrument(llm_span)
                    .await;
                let call_secs = call_start.elapsed().as_secs_f64();
                LLM_CALL_DURATION.with_label_values(&[&model]).observe(call_secs);

                let reply = match reply {
                    Ok(reply) => reply,
                    Err(e) => {
                        warn!(trace_id = %trace_id, iteration, error = %e, "Reasoning backend failed");
                        CHAT_REQUESTS.with_label_values(&["error"]).inc();
                        AGENT_ITERATIONS.observe(iteration as f64);
                        yield ChatEvent::Error { message: e.to_string() };
                        break;
                    }
                };
                info!(trace_id = %trace_id, iteration, duration_ms = call_secs * 1000.0, "LLM call completed");

                let calls = reply.requested_tools().to_vec();
                if calls.is_empty() {
                    info!(trace_id = %trace_id, iterations = iteration, "Chat request completed");
                    CHAT_REQUESTS.with_label_values(&["response"]).inc();
                    AGENT_ITERATIONS.observe(iteration as f64);
                    yield ChatEvent::Response { content: reply.text().to_string() };
                    yield ChatEvent::Done { iterations: iteration, max_reached: None };
                    break;
                }

                // Ids must be non-empty so tool replies can reference them
                let calls: Vec<_> = calls
                    .into_iter()
                    .enumerate()
                    .map(|(i, mut call)| {
                        if call.id.is_empty() {
                            call.id = format!("call_{}_{}", iteration, i);
                        }
                        call
                    })
                    .collect();
                messages.push(ChatMessage::assistant_with_tools(reply.content.clone(), calls.clone()));

                for call in calls {
                    let name = call.tool_name().to_string();
                    let raw = call.function.arguments.clone();

                    let result = if call.is_code_interpreter() {
                        let args = parse_raw_arguments(&name, &raw).unwrap_or(Value::String(raw));
                        yield ChatEvent::ToolStart { tool: name.clone(), args };
                        json!({
                            "success": true,
                            "message": "code_interpreter runs on the reasoning provider; acknowledged without local execution",
                        })
                    } else {
                        match parse_raw_arguments(&name, &raw) {
                            Err(e) => {
                                yield ChatEvent::ToolStart { tool: name.clone(), args: Value::String(raw) };
                                failure(&e)
                            }
                            Ok(args) => {
                                yield ChatEvent::ToolStart { tool: name.clone(), args: args.clone() };
                                tools.execute(&name, args).await
                            }
                        }
                    };

                    yield ChatEvent::ToolResult { tool: name.clone(), result: result.clone() };
                    if let Some(artifact) = result.get("artifact").filter(|a| a.is_object()) {
                        yield ChatEvent::Artifact { artifact: artifact.clone() };
                    }
                    messages.push(ChatMessage::tool(call.id, result.to_string()));
                }
            }
        }
    }
}
