use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use std::collections::HashSet;

use super::base::{StopReason, Usage};
use crate::models::content::ImageContent;
use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};

/// Convert internal messages to Anthropic's content-block message format
pub fn messages_to_anthropic_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        let role = match message.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };

        let mut blocks = Vec::new();
        for content in &message.content {
            match content {
                MessageContent::Text(text) => {
                    // The API rejects empty text blocks
                    if !text.text.is_empty() {
                        blocks.push(json!({"type": "text", "text": text.text}));
                    }
                }
                MessageContent::Image(image) => blocks.push(convert_image(image)),
                MessageContent::ToolRequest(request) => blocks.push(json!({
                    "type": "tool_use",
                    "id": request.id,
                    "name": request.tool_call.name,
                    "input": request.tool_call.arguments,
                })),
                MessageContent::ToolResponse(response) => blocks.push(json!({
                    "type": "tool_result",
                    "tool_use_id": response.id,
                    "content": response.output,
                })),
            }
        }

        if !blocks.is_empty() {
            messages_spec.push(json!({"role": role, "content": blocks}));
        }
    }

    messages_spec
}

pub fn convert_image(image: &ImageContent) -> Value {
    json!({
        "type": "image",
        "source": {
            "type": "base64",
            "media_type": image.mime_type,
            "data": image.data,
        }
    })
}

/// Convert tool definitions to Anthropic's tool specification
pub fn tools_to_anthropic_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "name": tool.name,
            "description": tool.description,
            "input_schema": tool.input_schema(),
        }));
    }

    Ok(result)
}

/// Convert an Anthropic response body to an assistant message
pub fn anthropic_response_to_message(response: &Value) -> Result<Message> {
    let blocks = response
        .get("content")
        .and_then(|c| c.as_array())
        .ok_or_else(|| anyhow!("Invalid response format from Anthropic API: missing content"))?;

    let mut message = Message::assistant();
    for block in blocks {
        match block.get("type").and_then(|t| t.as_str()) {
            Some("text") => {
                let text = block["text"].as_str().unwrap_or_default();
                message = message.with_text(text);
            }
            Some("tool_use") => {
                let id = block["id"]
                    .as_str()
                    .ok_or_else(|| anyhow!("tool_use block without an id"))?;
                let name = block["name"]
                    .as_str()
                    .ok_or_else(|| anyhow!("tool_use block without a name"))?;
                let input = block.get("input").cloned().unwrap_or_else(|| json!({}));
                message = message.with_tool_request(id, ToolCall::new(name, input));
            }
            // thinking and other block kinds are not carried
            _ => {}
        }
    }

    Ok(message)
}

pub fn get_stop_reason(response: &Value) -> StopReason {
    StopReason::from_api(response.get("stop_reason").and_then(|s| s.as_str()))
}

pub fn get_usage(response: &Value) -> Usage {
    let usage = &response["usage"];
    let input_tokens = usage["input_tokens"].as_i64().map(|v| v as i32);
    let output_tokens = usage["output_tokens"].as_i64().map(|v| v as i32);
    let total_tokens = match (input_tokens, output_tokens) {
        (None, None) => None,
        (i, o) => Some(i.unwrap_or(0) + o.unwrap_or(0)),
    };
    Usage::new(input_tokens, output_tokens, total_tokens)
}
