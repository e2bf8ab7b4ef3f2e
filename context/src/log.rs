//! Ordered message history for one agent's dialogue.
//!
//! # Invariant
//!
//! The first message of a log is always the system message. No truncation,
//! restore or branch operation may remove it. `ConversationLog` upholds
//! this structurally: the only constructor takes the system prompt, and
//! every mutating operation refuses to touch the head.

use mend_types::{Message, NonEmptyString};
use thiserror::Error;

use crate::template;

#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("restored message list is empty")]
    Empty,
    #[error("restored message list does not start with a system message (found {role})")]
    MissingSystemHead { role: &'static str },
}

/// Append-ordered conversation history. Insertion order is significant: the
/// message list is the literal model context.
#[derive(Debug, Clone)]
pub struct ConversationLog {
    messages: Vec<Message>,
}

impl ConversationLog {
    /// Start a log with its pinned system message.
    #[must_use]
    pub fn new(system: NonEmptyString) -> Self {
        Self {
            messages: vec![Message::system(system)],
        }
    }

    pub fn append_user(&mut self, content: NonEmptyString) {
        self.messages.push(Message::user(content));
    }

    pub fn append_assistant(&mut self, content: NonEmptyString) {
        self.messages.push(Message::assistant(content));
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// A log always contains at least the system head.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of exchanged (non-system) messages.
    #[must_use]
    pub fn exchange_len(&self) -> usize {
        self.messages.len() - 1
    }

    /// Drop the last `n` exchanged messages. The system head survives even
    /// when `n` exceeds the number of removable messages.
    pub fn truncate(&mut self, n: usize) {
        let removable = self.exchange_len();
        let n = n.min(removable);
        if n == 0 {
            return;
        }
        tracing::debug!(removed = n, "truncating conversation tail");
        let keep = self.messages.len() - n;
        self.messages.truncate(keep);
    }

    /// Replace the message list wholesale (branch load, checkpoint replay).
    ///
    /// The incoming list must carry a system head; anything else indicates a
    /// corrupt snapshot and is rejected without mutating the log.
    pub fn restore(&mut self, messages: Vec<Message>) -> Result<(), RestoreError> {
        match messages.first() {
            None => Err(RestoreError::Empty),
            Some(head) if head.is_system() => {
                self.messages = messages;
                Ok(())
            }
            Some(head) => Err(RestoreError::MissingSystemHead {
                role: head.role_str(),
            }),
        }
    }

    /// Take an independent snapshot of the message list.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Rewrite fenced file blocks in every user message to the current file
    /// contents, so historical turns never show stale code.
    ///
    /// `lookup` maps a qualified file path to its current content; blocks
    /// whose path it does not know, and messages without any file block,
    /// pass through untouched.
    pub fn substitute_file_contents(&mut self, mut lookup: impl FnMut(&str) -> Option<String>) {
        for message in &mut self.messages {
            if !message.is_user() {
                continue;
            }
            if let Some(rewritten) = template::rewrite_file_blocks(message.content(), &mut lookup)
                && let Ok(content) = NonEmptyString::new(rewritten)
            {
                *message = Message::user(content);
            }
        }
    }
}
