//! Local files sent along with a user message.
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::io;
use std::path::{Path, PathBuf};

use crate::models::message::{Message, MessageContent};

/// Characters of a text attachment kept before truncation
pub const MAX_ATTACHMENT_CHARS: usize = 120_000;

pub const TRUNCATION_MARKER: &str = "\n...[truncated at 120 KB]";

const IMAGE_TYPES: [(&str, &str); 5] = [
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    path: PathBuf,
    name: String,
    mime_type: Option<&'static str>,
}

impl Attachment {
    pub fn from_path<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a file", path.display()),
            ));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let mime_type = IMAGE_TYPES
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, mime)| *mime);

        Ok(Self {
            path: path.to_path_buf(),
            name,
            mime_type,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.is_some()
    }

    /// The content block for this file. Only images can fail: a text file
    /// that cannot be read is described in the block instead.
    pub fn to_content(&self) -> io::Result<MessageContent> {
        if let Some(mime_type) = self.mime_type {
            let bytes = std::fs::read(&self.path)?;
            return Ok(MessageContent::image(STANDARD.encode(bytes), mime_type));
        }

        let body = match std::fs::read(&self.path) {
            Ok(bytes) => truncate_text(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => format!("[Could not read file: {}]", e),
        };
        Ok(MessageContent::text(format!(
            "<file name=\"{}\">\n{}\n</file>",
            self.name, body
        )))
    }
}

fn truncate_text(content: String) -> String {
    match content.char_indices().nth(MAX_ATTACHMENT_CHARS) {
        Some((idx, _)) => format!("{}{}", &content[..idx], TRUNCATION_MARKER),
        None => content,
    }
}

/// A user message with the attachments first and the typed text last
pub fn user_message(text: &str, attachments: &[Attachment]) -> io::Result<Message> {
    let mut message = Message::user();
    for attachment in attachments {
        message = message.with_content(attachment.to_content()?);
    }
    if !text.is_empty() || attachments.is_empty() {
        message = message.with_text(text);
    }
    Ok(message)
}
