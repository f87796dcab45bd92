use chrono::Local;
use serde::Serialize;
use tera::{Context, Error as TeraError, Tera};

use crate::models::tool::Tool;

const SYSTEM_PROMPT_TEMPLATE: &str = include_str!("prompts/system.md");

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered)
}

#[derive(Serialize)]
struct ToolSummary<'a> {
    name: &'a str,
    /// First line of the description
    summary: &'a str,
}

#[derive(Serialize)]
struct SystemPromptContext<'a> {
    instance: &'a str,
    username: &'a str,
    tools: Vec<ToolSummary<'a>>,
    date: String,
}

/// The system prompt for a session against `instance` as `username`
pub fn system_prompt(instance: &str, username: &str, tools: &[Tool]) -> Result<String, TeraError> {
    let context = SystemPromptContext {
        instance,
        username,
        tools: tools
            .iter()
            .map(|tool| ToolSummary {
                name: &tool.name,
                summary: tool.description.lines().next().unwrap_or_default(),
            })
            .collect(),
        date: Local::now().format("%Y-%m-%d").to_string(),
    };
    load_prompt(SYSTEM_PROMPT_TEMPLATE, &context)
}
