//! Model-request collaborator contract.
//!
//! The engine never talks to a concrete LLM API; it talks to a
//! [`ModelClient`]. A real client (HTTP, streaming, auth) lives in the host
//! application. This crate defines the seam: the request shape, the error
//! taxonomy the engine is allowed to react to, and a scripted mock for
//! deterministic tests.
//!
//! # Error taxonomy
//!
//! The engine treats client failures opaquely except for two distinguished
//! conditions:
//!
//! - [`ModelError::LimitExceeded`] - the context window is exhausted. No
//!   local corrective action can fix this, so it propagates unmodified and
//!   is never retried.
//! - [`ModelError::EmptyResponse`] - the collaborator produced nothing.
//!   This is a transport-level failure, not a correctable bad edit, and it
//!   surfaces immediately.
//!
//! Everything else is [`ModelError::Transport`].

pub mod mock;

use mend_types::{Message, ModelResponse, StepId};
use thiserror::Error;

/// One request to the model: the ordered message context plus the
/// bookkeeping the client may want for logging or caching.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    /// The literal model context, in order. The first message is the
    /// system prompt.
    pub messages: &'a [Message],
    /// Label of the agent holding the conversation (for diagnostics).
    pub agent: &'a str,
    /// Step id this exchange will be checkpointed under.
    pub step: StepId,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    /// The request exceeded the model's context window. Propagated to the
    /// caller unchanged; never retried.
    #[error("model context limit exceeded: {0}")]
    LimitExceeded(String),
    /// The collaborator returned no content at all. Fatal for the exchange.
    #[error("model returned an empty response")]
    EmptyResponse,
    /// Any other collaborator failure, reported opaquely.
    #[error("model request failed: {0}")]
    Transport(String),
}

impl ModelError {
    /// True for conditions the session must surface without retrying.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, ModelError::LimitExceeded(_) | ModelError::EmptyResponse)
    }
}

/// A blocking request/response collaborator.
///
/// The session suspends on `send` and applies no timeout of its own;
/// deadlines, retries against the wire, and cancellation are the client's
/// responsibility.
pub trait ModelClient {
    fn send(
        &mut self,
        request: ModelRequest<'_>,
    ) -> impl Future<Output = Result<ModelResponse, ModelError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::ModelError;

    #[test]
    fn fatal_conditions() {
        assert!(ModelError::LimitExceeded("8192".into()).is_fatal());
        assert!(ModelError::EmptyResponse.is_fatal());
        assert!(!ModelError::Transport("503".into()).is_fatal());
    }
}
