//! Conversation messages and mode-dependent canned replies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::mode::Mode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub text: String,
    /// Mode active when the message was produced.
    pub mode: Mode,
    /// User message an assistant reply answers.
    #[serde(default)]
    pub in_reply_to: Option<String>,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, text: impl Into<String>, mode: Mode) -> Self {
        Self {
            id: format!("msg-{}", uuid::Uuid::new_v4()),
            role,
            text: text.into(),
            mode,
            in_reply_to: None,
            sent_at: Utc::now(),
        }
    }

    pub fn replying_to(mut self, message_id: impl Into<String>) -> Self {
        self.in_reply_to = Some(message_id.into());
        self
    }
}

/// User messages that no assistant message answers yet, oldest first.
pub fn unanswered(messages: &[ChatMessage]) -> impl Iterator<Item = &ChatMessage> {
    messages.iter().filter(move |m| {
        m.role == Role::User
            && !messages
                .iter()
                .any(|r| r.in_reply_to.as_deref() == Some(m.id.as_str()))
    })
}

pub fn validate_message(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::MissingField("text"));
    }
    Ok(())
}

/// Simulated assistant reply for `text` under `mode`.
pub fn canned_reply(mode: Mode, text: &str) -> String {
    let topic: String = text.split_whitespace().take(6).collect::<Vec<_>>().join(" ");
    match mode {
        Mode::Normal => format!("Let's explore \"{topic}\" together. What do you already know about it?"),
        Mode::Productivity => {
            format!("Next action for \"{topic}\": break it into one step you can finish in 25 minutes.")
        }
        Mode::Focus => format!("Noted: \"{topic}\". Stay on it; I'll keep this short."),
        // Unreachable through the store: input is disabled and replies are cancelled.
        Mode::Sleep => "It's late. Let's pick this up after some rest.".to_string(),
    }
}
