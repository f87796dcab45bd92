use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::providers::base::{Provider, ProviderResponse, StopReason, Usage};

/// A mock provider that plays back scripted responses for testing
pub struct MockProvider {
    responses: Arc<Mutex<Vec<Result<ProviderResponse>>>>,
    repeat: Option<ProviderResponse>,
    history_lengths: Arc<Mutex<Vec<usize>>>,
}

impl MockProvider {
    pub fn new(responses: Vec<Result<ProviderResponse>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            repeat: None,
            history_lengths: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answers every call with the same response
    pub fn repeating(response: ProviderResponse) -> Self {
        Self {
            repeat: Some(response),
            ..Self::new(Vec::new())
        }
    }

    /// Number of messages the provider saw on each call
    pub fn history_lengths(&self) -> Vec<usize> {
        self.history_lengths.lock().unwrap().clone()
    }
}

pub fn end_turn(text: &str) -> Result<ProviderResponse> {
    Ok(ProviderResponse::new(
        Message::assistant().with_text(text),
        StopReason::EndTurn,
        Usage::new(Some(10), Some(5), Some(15)),
    ))
}

pub fn tool_use(message: Message) -> Result<ProviderResponse> {
    Ok(ProviderResponse::new(
        message,
        StopReason::ToolUse,
        Usage::new(Some(10), Some(5), Some(15)),
    ))
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        _system: &str,
        messages: &[Message],
        _tools: &[Tool],
    ) -> Result<ProviderResponse> {
        self.history_lengths.lock().unwrap().push(messages.len());

        if let Some(response) = &self.repeat {
            return Ok(response.clone());
        }

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Err(anyhow!("no scripted response left"))
        } else {
            responses.remove(0)
        }
    }
}
