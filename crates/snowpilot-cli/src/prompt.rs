use anyhow::Result;
use snowpilot::models::message::Message;

pub mod rustyline;
pub mod thinking;

pub trait Prompt {
    fn render(&mut self, message: Box<Message>);
    fn get_input(&mut self) -> Result<Input>;
    fn show_busy(&mut self);
    fn hide_busy(&self);
    fn close(&self);
    fn ready(&self) {
        println!();
        println!("Ready. Describe the configuration you want, or /help for commands.");
        println!();
    }
}

#[derive(Debug, PartialEq)]
pub struct Input {
    pub input_type: InputType,
    pub content: Option<String>, // Message text, or the path for /attach
}

#[derive(Debug, PartialEq)]
pub enum InputType {
    AskAgain, // Ask the user for input again. Control flow command.
    Message,  // User sent a message
    Attach,   // Queue a file for the next message
    Clear,    // Start a fresh conversation
    History,  // Show how long the conversation is
    Help,
    Exit, // User wants to exit the session
}

impl Input {
    fn command(input_type: InputType) -> Self {
        Self {
            input_type,
            content: None,
        }
    }
}

/// Classify one line typed at the prompt
pub fn parse_input(line: &str) -> Input {
    let text = line.trim();
    let lowered = text.to_lowercase();

    match lowered.as_str() {
        "" => Input::command(InputType::AskAgain),
        "exit" | "quit" | "q" | "/exit" | "/quit" => Input::command(InputType::Exit),
        "clear" | "/clear" => Input::command(InputType::Clear),
        "/history" => Input::command(InputType::History),
        "/help" | "/?" => Input::command(InputType::Help),
        _ if lowered == "/attach" || lowered.starts_with("/attach ") => {
            let path = text.get("/attach".len()..).unwrap_or_default().trim();
            if path.is_empty() {
                Input::command(InputType::Help)
            } else {
                Input {
                    input_type: InputType::Attach,
                    content: Some(path.to_string()),
                }
            }
        }
        _ => Input {
            input_type: InputType::Message,
            content: Some(text.to_string()),
        },
    }
}

pub fn print_help() {
    println!("Commands:");
    println!("/attach <path> - Attach a file or image to the next message");
    println!("/clear | clear - Start a new conversation");
    println!("/history - Show the number of messages in the conversation");
    println!("/exit | exit | quit | q - Exit the session");
    println!("/? | /help - Display this help message");
    println!("Ctrl+C - Interrupt the agent (resets the conversation to before the interrupted request)");
}
