use anyhow::{anyhow, Context, Result};
use cliclack::spinner;
use console::style;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use crate::prompt::Prompt;
use crate::session::Session;
use snowpilot::agent::Agent;
use snowpilot::attachments::Attachment;
use snowpilot::config::Config;
use snowpilot::prompt_template::system_prompt;
use snowpilot::providers::anthropic::AnthropicProvider;
use snowpilot::servicenow::{normalize_instance, RecordStore, ServiceNowClient};
use snowpilot::tools::ToolCatalog;

/// Connect to the instance, check the connection and assemble the agent
pub async fn build_session<'a>(
    config: &Config,
    prompt: Box<dyn Prompt + 'a>,
    attachments: &[PathBuf],
) -> Result<Session<'a>> {
    let attachments = attachments
        .iter()
        .map(|path| {
            Attachment::from_path(path)
                .with_context(|| format!("Cannot attach {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let client = ServiceNowClient::new(&config.servicenow)?;
    let instance = normalize_instance(&config.servicenow.instance);

    let spin = spinner();
    spin.start(format!(
        "Connecting to {} as {}...",
        client.base_url(),
        config.servicenow.username
    ));
    let whoami = match client.whoami().await {
        Ok(whoami) => whoami,
        Err(e) => {
            spin.error("Connection failed");
            return Err(e).context("Connection failed");
        }
    };
    if !whoami.is_success() {
        spin.error("Connection failed");
        return Err(anyhow!(
            "Connection failed: {}{}",
            whoami.error().unwrap_or("Unknown error"),
            whoami
                .detail()
                .map(|detail| format!(" ({})", detail))
                .unwrap_or_default()
        ));
    }
    let display_name = whoami
        .records()
        .first()
        .and_then(|user| user.get("name"))
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .unwrap_or(&config.servicenow.username)
        .to_string();
    spin.stop(format!("Connected as: {}", style(&display_name).green()));

    report_update_sets(&client).await;

    let catalog = ToolCatalog::new();
    let system = system_prompt(&instance, client.username(), catalog.tools())
        .context("Failed to render the system prompt")?;
    let provider = AnthropicProvider::new(config.anthropic.clone())?;
    let agent = Agent::new(Box::new(provider), Arc::new(client), system)
        .with_max_iterations(config.max_iterations);

    Ok(Session::new(agent, prompt, attachments))
}

/// Print the selected and the in-progress update sets; failures here are not fatal
async fn report_update_sets(client: &ServiceNowClient) {
    match client.current_update_set().await {
        Ok(current) if current.is_success() => {
            if let Some(name) = current
                .data()
                .and_then(|set| set.get("name"))
                .and_then(Value::as_str)
            {
                println!("Current update set: {}", style(name).cyan());
            }
        }
        Ok(current) => {
            if let Some(error) = current.error() {
                println!("{}", style(error).dim());
            }
        }
        Err(e) => tracing::warn!("could not read the current update set: {}", e),
    }

    match client.in_progress_update_sets(5).await {
        Ok(sets) if sets.is_success() && !sets.records().is_empty() => {
            let names: Vec<&str> = sets
                .records()
                .iter()
                .take(3)
                .map(|set| set.get("name").and_then(Value::as_str).unwrap_or("Unknown"))
                .collect();
            println!("In-progress update sets: {}", style(names.join(", ")).cyan());
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("could not list update sets: {}", e),
    }
}
