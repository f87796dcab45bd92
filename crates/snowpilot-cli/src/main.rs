use anyhow::Result;
use clap::Parser;
use console::style;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

mod commands;
mod prompt;
mod session;

use commands::session::build_session;
use prompt::rustyline::RustylinePrompt;
use snowpilot::config::Config;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Task to run without entering the interactive session
    task: Vec<String>,

    /// Model to use (overrides ANTHROPIC_MODEL)
    #[arg(short, long)]
    model: Option<String>,

    /// Maximum model calls per request (overrides SNOWPILOT_MAX_ITERATIONS)
    #[arg(long)]
    max_iterations: Option<usize>,

    /// File or image to send with the first message; repeatable
    #[arg(short, long = "attach", value_name = "PATH")]
    attachments: Vec<PathBuf>,

    /// Show tool inputs and results
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenv::dotenv().ok();
    init_tracing(cli.verbose);

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red(), e);
            eprintln!("Copy .env.example to .env and fill in your credentials.");
            process::exit(1);
        }
    };
    if let Some(model) = cli.model {
        config.anthropic.model = model;
    }
    if let Some(max_iterations) = cli.max_iterations {
        config.max_iterations = max_iterations.max(1);
    }

    let prompt = Box::new(RustylinePrompt::new(cli.verbose)?);
    let mut session = match build_session(&config, prompt, &cli.attachments).await {
        Ok(session) => session,
        Err(e) => {
            eprintln!("{} {:#}", style("Error:").red(), e);
            process::exit(1);
        }
    };

    if cli.task.is_empty() {
        session.start().await?;
    } else {
        session.headless_start(&cli.task.join(" ")).await?;
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,snowpilot=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_headless_task() {
        let cli = Cli::parse_from([
            "snowpilot",
            "--verbose",
            "--attach",
            "rule.js",
            "-a",
            "form.png",
            "Add",
            "a",
            "field",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.task.join(" "), "Add a field");
        assert_eq!(cli.attachments.len(), 2);
        assert_eq!(cli.model, None);
    }

    #[test]
    fn test_cli_interactive_defaults() {
        let cli = Cli::parse_from(["snowpilot", "--max-iterations", "10", "-m", "claude-3-5-haiku-latest"]);
        assert!(cli.task.is_empty());
        assert_eq!(cli.max_iterations, Some(10));
        assert_eq!(cli.model.as_deref(), Some("claude-3-5-haiku-latest"));
    }
}
