use anyhow::{anyhow, Context, Result};
use console::style;
use futures::StreamExt;
use std::path::Path;

use crate::prompt::{InputType, Prompt};
use snowpilot::agent::{Agent, AgentEvent, TurnOutcome, TurnSummary};
use snowpilot::attachments::{user_message, Attachment};
use snowpilot::conversation::Conversation;
use snowpilot::models::message::Message;

pub struct Session<'a> {
    agent: Agent,
    prompt: Box<dyn Prompt + 'a>,
    conversation: Conversation,
    attachments: Vec<Attachment>,
}

/// How a single turn ended, from the session's point of view
enum TurnResult {
    Finished(TurnSummary),
    Interrupted,
    Failed(anyhow::Error),
}

impl<'a> Session<'a> {
    pub fn new(agent: Agent, prompt: Box<dyn Prompt + 'a>, attachments: Vec<Attachment>) -> Self {
        Session {
            agent,
            prompt,
            conversation: Conversation::new(),
            attachments,
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        self.prompt.ready();

        loop {
            let input = self.prompt.get_input()?;
            let text = match input.input_type {
                InputType::Message => input.content.unwrap_or_default(),
                InputType::Attach => {
                    if let Some(path) = input.content {
                        self.queue_attachment(&path);
                    }
                    continue;
                }
                InputType::Clear => {
                    self.conversation.clear();
                    self.attachments.clear();
                    self.prompt.render(raw_message("Conversation cleared.\n"));
                    continue;
                }
                InputType::History => {
                    let notice = format!("{} messages in this conversation.\n", self.conversation.len());
                    self.prompt.render(raw_message(&notice));
                    continue;
                }
                InputType::Exit => break,
                InputType::AskAgain | InputType::Help => continue,
            };

            let message = match self.take_message(&text) {
                Ok(message) => message,
                Err(e) => {
                    eprintln!("{} {:#}", style("Error:").red(), e);
                    continue;
                }
            };

            match self.process_turn(message).await {
                TurnResult::Finished(summary) => report_outcome(&summary, self.agent.max_iterations()),
                TurnResult::Interrupted => self.prompt.render(raw_message(
                    " Interrupt: Resetting conversation to before the last sent message...\n",
                )),
                TurnResult::Failed(e) => {
                    eprintln!("{} {:#}", style("Error:").red(), e);
                }
            }
        }

        self.prompt.close();
        Ok(())
    }

    /// Run one task and exit; a failed model call is an error
    pub async fn headless_start(&mut self, task: &str) -> Result<TurnSummary> {
        self.prompt.render(raw_message(&format!("Task: {}\n", task)));
        let message = self.take_message(task)?;

        match self.process_turn(message).await {
            TurnResult::Finished(summary) => {
                report_outcome(&summary, self.agent.max_iterations());
                Ok(summary)
            }
            TurnResult::Interrupted => Err(anyhow!("interrupted")),
            TurnResult::Failed(e) => Err(e),
        }
    }

    fn queue_attachment(&mut self, path: &str) {
        match Attachment::from_path(Path::new(path)) {
            Ok(attachment) => {
                let notice = format!(
                    "Attached {} ({} queued for the next message).\n",
                    attachment.name(),
                    self.attachments.len() + 1
                );
                self.attachments.push(attachment);
                self.prompt.render(raw_message(&notice));
            }
            Err(e) => eprintln!("{} could not attach {}: {}", style("Error:").red(), path, e),
        }
    }

    /// Build the user message, consuming any queued attachments
    fn take_message(&mut self, text: &str) -> Result<Message> {
        let message = user_message(text, &self.attachments).context("Failed to read attachment")?;
        self.attachments.clear();
        Ok(message)
    }

    async fn process_turn(&mut self, message: Message) -> TurnResult {
        let checkpoint = self.conversation.len();
        let mut result = TurnResult::Failed(anyhow!("turn ended without a summary"));
        let mut interrupted = false;

        self.prompt.show_busy();
        {
            let mut stream = self.agent.reply(&mut self.conversation, message);
            loop {
                tokio::select! {
                    event = stream.next() => {
                        match event {
                            Some(Ok(AgentEvent::Message(message))) => {
                                self.prompt.hide_busy();
                                self.prompt.render(Box::new(message));
                                self.prompt.show_busy();
                            }
                            Some(Ok(AgentEvent::Finished(summary))) => {
                                result = TurnResult::Finished(summary);
                            }
                            Some(Err(e)) => {
                                result = TurnResult::Failed(e);
                                break;
                            }
                            None => break,
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        interrupted = true;
                        break;
                    }
                }
            }
        }
        self.prompt.hide_busy();

        if interrupted {
            // Drops the request and everything the agent appended after it
            self.conversation.truncate(checkpoint);
            return TurnResult::Interrupted;
        }
        result
    }
}

fn report_outcome(summary: &TurnSummary, max_iterations: usize) {
    match &summary.outcome {
        TurnOutcome::Completed => {}
        TurnOutcome::Aborted(stop_reason) => eprintln!(
            "{} the model stopped early ({}); ask it to continue or narrow the request.",
            style("Warning:").yellow(),
            stop_reason
        ),
        TurnOutcome::IterationLimit => eprintln!(
            "{} reached the limit of {} model calls for one request.",
            style("Warning:").yellow(),
            max_iterations
        ),
    }
}

fn raw_message(content: &str) -> Box<Message> {
    Box::new(Message::assistant().with_text(content))
}
