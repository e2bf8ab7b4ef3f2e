//! Conversation message domain model.
//!
//! `Message` is a real sum type (not a role tag plus "sometimes-meaningful"
//! fields). Messages carry only role and content: the ordered message list
//! is the literal model context, and keeping it free of clocks or other
//! incidental state is what makes replay deterministic.

use serde::{Deserialize, Serialize};

use crate::proofs::{EmptyStringError, NonEmptyString};

/// One turn of a conversation.
///
/// Serializes as `{"role": "system" | "user" | "assistant", "content": "..."}`,
/// which is the exact shape the checkpoint store round-trips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System { content: NonEmptyString },
    User { content: NonEmptyString },
    Assistant { content: NonEmptyString },
}

impl Message {
    #[must_use]
    pub fn system(content: NonEmptyString) -> Self {
        Self::System { content }
    }

    #[must_use]
    pub fn user(content: NonEmptyString) -> Self {
        Self::User { content }
    }

    #[must_use]
    pub fn assistant(content: NonEmptyString) -> Self {
        Self::Assistant { content }
    }

    pub fn try_system(content: impl Into<String>) -> Result<Self, EmptyStringError> {
        Ok(Self::system(NonEmptyString::new(content)?))
    }

    pub fn try_user(content: impl Into<String>) -> Result<Self, EmptyStringError> {
        Ok(Self::user(NonEmptyString::new(content)?))
    }

    pub fn try_assistant(content: impl Into<String>) -> Result<Self, EmptyStringError> {
        Ok(Self::assistant(NonEmptyString::new(content)?))
    }

    #[must_use]
    pub fn role_str(&self) -> &'static str {
        match self {
            Message::System { .. } => "system",
            Message::User { .. } => "user",
            Message::Assistant { .. } => "assistant",
        }
    }

    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Message::System { content }
            | Message::User { content }
            | Message::Assistant { content } => content.as_str(),
        }
    }

    #[must_use]
    pub fn is_system(&self) -> bool {
        matches!(self, Message::System { .. })
    }

    #[must_use]
    pub fn is_user(&self) -> bool {
        matches!(self, Message::User { .. })
    }
}
