use anyhow::{anyhow, Result};
use futures::stream::BoxStream;
use futures::TryStreamExt;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::conversation::Conversation;
use crate::models::message::{Message, ToolRequest};
use crate::providers::base::{Provider, StopReason, Usage};
use crate::servicenow::RecordStore;
use crate::tools::{preview_result, summarize_input, ToolCatalog};

/// Model calls allowed in a single turn
pub const DEFAULT_MAX_ITERATIONS: usize = 50;

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model ended its turn
    Completed,
    /// The model stopped for any reason other than ending its turn or asking for tools
    Aborted(StopReason),
    /// The model was still asking for tools when the call budget ran out
    IterationLimit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnSummary {
    pub outcome: TurnOutcome,
    pub model_calls: usize,
    pub usage: Usage,
}

#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// A message appended to the conversation: an assistant reply or a batch of tool results
    Message(Message),
    Finished(TurnSummary),
}

/// Agent drives the model through tool calls against one ServiceNow instance
pub struct Agent {
    provider: Box<dyn Provider>,
    store: Arc<dyn RecordStore>,
    catalog: ToolCatalog,
    system_prompt: String,
    max_iterations: usize,
}

impl Agent {
    pub fn new<S: Into<String>>(
        provider: Box<dyn Provider>,
        store: Arc<dyn RecordStore>,
        system_prompt: S,
    ) -> Self {
        Self {
            provider,
            store,
            catalog: ToolCatalog::new(),
            system_prompt: system_prompt.into(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Run one turn for `message`, yielding every message appended to the
    /// conversation and finally a [`TurnSummary`].
    ///
    /// A failed model call ends the stream with an error. Everything appended
    /// before the failure stays in the conversation, which remains valid to
    /// continue from.
    pub fn reply<'a>(
        &'a self,
        conversation: &'a mut Conversation,
        message: Message,
    ) -> BoxStream<'a, Result<AgentEvent>> {
        Box::pin(async_stream::try_stream! {
            conversation.push(message);

            let tools = self.catalog.tools();
            let mut usage = Usage::default();
            let mut model_calls = 0;

            let outcome = loop {
                if model_calls >= self.max_iterations {
                    warn!(max_iterations = self.max_iterations, "iteration limit reached, ending turn");
                    break TurnOutcome::IterationLimit;
                }
                model_calls += 1;

                debug!(call = model_calls, messages = conversation.len(), "requesting model response");
                let response = self
                    .provider
                    .complete(&self.system_prompt, conversation.messages(), tools)
                    .await?;
                usage.add(&response.usage);

                let assistant = response.message;
                let requests: Vec<ToolRequest> = assistant.tool_requests().cloned().collect();
                conversation.push(assistant.clone());
                yield AgentEvent::Message(assistant);

                // Make sure the reply reaches the caller before tools start running
                tokio::task::yield_now().await;

                match response.stop_reason {
                    StopReason::EndTurn => break TurnOutcome::Completed,
                    StopReason::ToolUse if requests.is_empty() => {
                        warn!("model asked for tools without naming any");
                        break TurnOutcome::Aborted(StopReason::ToolUse);
                    }
                    StopReason::ToolUse => {
                        let results = self.run_tools(&requests).await;
                        conversation.push(results.clone());
                        yield AgentEvent::Message(results);
                    }
                    stop_reason => {
                        warn!(%stop_reason, "model stopped before finishing the turn");
                        if !requests.is_empty() {
                            let skipped = skipped_tools(&requests, &stop_reason);
                            conversation.push(skipped.clone());
                            yield AgentEvent::Message(skipped);
                        }
                        break TurnOutcome::Aborted(stop_reason);
                    }
                }
            };

            yield AgentEvent::Finished(TurnSummary {
                outcome,
                model_calls,
                usage,
            });
        })
    }

    /// Drain a turn and return its summary
    pub async fn run_turn(
        &self,
        conversation: &mut Conversation,
        message: Message,
    ) -> Result<TurnSummary> {
        let mut stream = self.reply(conversation, message);
        while let Some(event) = stream.try_next().await? {
            if let AgentEvent::Finished(summary) = event {
                return Ok(summary);
            }
        }
        Err(anyhow!("turn ended without a summary"))
    }

    /// Dispatch each request in order, one at a time
    async fn run_tools(&self, requests: &[ToolRequest]) -> Message {
        let mut results = Message::user();
        for request in requests {
            let call = &request.tool_call;
            info!(tool = %call.name, input = %summarize_input(&call.arguments), "running tool");
            let output = self
                .catalog
                .dispatch(self.store.as_ref(), &call.name, &call.arguments)
                .await;
            debug!(tool = %call.name, result = %preview_result(&output), "tool finished");
            results = results.with_tool_response(request.id.clone(), output);
        }
        results
    }
}

/// Results for requests left unanswered by an aborted turn, so the
/// conversation can be continued
fn skipped_tools(requests: &[ToolRequest], stop_reason: &StopReason) -> Message {
    requests.iter().fold(Message::user(), |message, request| {
        let output = json!({
            "success": false,
            "error": format!("Tool call was not executed: the response stopped early ({})", stop_reason),
        });
        message.with_tool_response(request.id.clone(), output.to_string())
    })
}
