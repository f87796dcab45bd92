use std::io::{self, Write};

use anyhow::Result;
use bat::WrappingMode;
use cliclack::spinner;
use console::style;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde_json::Value;
use snowpilot::models::message::{Message, MessageContent, ToolRequest, ToolResponse};
use snowpilot::tools::preview_result;

use super::{parse_input, print_help, thinking::get_random_thinking_message, Input, InputType, Prompt};

const PROMPT: &str = "\x1b[1m\x1b[38;5;33msnow> \x1b[0m";
const MAX_STRING_LENGTH: usize = 60;
const INDENT: &str = "    ";
const THEME: &str = "zenburn";

pub struct RustylinePrompt {
    spinner: cliclack::ProgressBar,
    editor: DefaultEditor,
    verbose: bool,
}

impl RustylinePrompt {
    pub fn new(verbose: bool) -> Result<Self> {
        Ok(RustylinePrompt {
            spinner: spinner(),
            editor: DefaultEditor::new()?,
            verbose,
        })
    }
}

fn print_markdown(content: &str) {
    let printed = bat::PrettyPrinter::new()
        .input(bat::Input::from_bytes(content.as_bytes()))
        .theme(THEME)
        .language("Markdown")
        .wrapping_mode(WrappingMode::Character)
        .print();
    if let Err(e) = printed {
        eprintln!("{}", e);
        println!("{}", content);
    }
}

fn print_request(request: &ToolRequest, verbose: bool) {
    let call = &request.tool_call;
    let target = call
        .arguments
        .get("table")
        .or_else(|| call.arguments.get("search_term"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    println!();
    println!(
        "─── {} | {} ──────────────────────────",
        style(&call.name),
        style(target).magenta().dim(),
    );
    if verbose {
        print_params(&call.arguments, 0);
    }
}

fn print_response(response: &ToolResponse, verbose: bool) {
    let parsed: Value = serde_json::from_str(&response.output).unwrap_or(Value::Null);
    let success = parsed.get("success").and_then(Value::as_bool).unwrap_or(false);

    if !success {
        let error = parsed
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("tool failed");
        match parsed.get("status_code").and_then(Value::as_u64) {
            Some(status) => println!("{} {} ({})", style("✗").red(), style(error).red(), status),
            None => println!("{} {}", style("✗").red(), style(error).red()),
        }
        if let Some(detail) = parsed.get("detail").and_then(Value::as_str) {
            println!("{}{}", INDENT, style(detail).dim());
        }
    } else if verbose {
        println!("{} {}", style("✓").green(), style(preview_result(&response.output)).dim());
    } else {
        let count = parsed
            .get("data")
            .and_then(Value::as_array)
            .map(|records| format!("{} records", records.len()));
        println!("{} {}", style("✓").green(), style(count.unwrap_or_else(|| "done".to_string())).dim());
    }
}

/// Format and print parameters recursively with proper indentation and colors
fn print_params(value: &Value, depth: usize) {
    let indent = INDENT.repeat(depth);

    match value {
        Value::Object(map) => {
            for (key, val) in map {
                match val {
                    Value::Object(_) => {
                        println!("{}{}:", indent, style(key).dim());
                        print_params(val, depth + 1);
                    }
                    Value::Array(arr) => {
                        println!("{}{}:", indent, style(key).dim());
                        for item in arr.iter() {
                            print_params(item, depth + 1);
                        }
                    }
                    Value::String(s) => {
                        if s.chars().count() > MAX_STRING_LENGTH {
                            let lines = s.lines().count();
                            println!(
                                "{}{}: {}",
                                indent,
                                style(key).dim(),
                                style(format!("[{} chars, {} lines]", s.chars().count(), lines)).yellow()
                            );
                        } else {
                            println!("{}{}: {}", indent, style(key).dim(), style(s).green());
                        }
                    }
                    Value::Number(n) => {
                        println!("{}{}: {}", indent, style(key).dim(), style(n).blue());
                    }
                    Value::Bool(b) => {
                        println!("{}{}: {}", indent, style(key).dim(), style(b).blue());
                    }
                    Value::Null => {
                        println!("{}{}: {}", indent, style(key).dim(), style("null").dim());
                    }
                }
            }
        }
        Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                println!("{}{}.", indent, i + 1);
                print_params(item, depth + 1);
            }
        }
        Value::String(s) => println!("{}- {}", indent, style(s).green()),
        Value::Number(n) => println!("{}- {}", indent, style(n).yellow()),
        Value::Bool(b) => println!("{}- {}", indent, style(b).yellow()),
        Value::Null => println!("{}- {}", indent, style("null").dim()),
    }
}

impl Prompt for RustylinePrompt {
    fn render(&mut self, message: Box<Message>) {
        for message_content in &message.content {
            match message_content {
                MessageContent::Text(text) if text.text.trim().is_empty() => {}
                MessageContent::Text(text) => print_markdown(&text.text),
                MessageContent::ToolRequest(request) => print_request(request, self.verbose),
                MessageContent::ToolResponse(response) => print_response(response, self.verbose),
                MessageContent::Image(image) => {
                    println!("{}", style(format!("[image: {}]", image.mime_type)).dim());
                }
            }
        }

        println!();
        let _ = io::stdout().flush();
    }

    fn show_busy(&mut self) {
        self.spinner = spinner();
        self.spinner
            .start(format!("{}...", get_random_thinking_message()));
    }

    fn hide_busy(&self) {
        self.spinner.stop("");
    }

    fn get_input(&mut self) -> Result<Input> {
        let line = match self.editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                return Ok(Input {
                    input_type: InputType::Exit,
                    content: None,
                });
            }
            Err(e) => return Err(e.into()),
        };

        if !line.trim().is_empty() {
            let _ = self.editor.add_history_entry(line.as_str());
        }

        let input = parse_input(&line);
        if input.input_type == InputType::Help {
            print_help();
            return Ok(Input {
                input_type: InputType::AskAgain,
                content: None,
            });
        }
        Ok(input)
    }

    fn close(&self) {
        println!("{}", style("Goodbye!").dim());
    }
}
