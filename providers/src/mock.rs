//! Scripted model client for tests.
//!
//! Engine tests drive sessions against canned outcomes instead of network
//! fakes: push the responses the "model" should give, run the session, then
//! inspect what was actually sent.

use std::collections::VecDeque;

use mend_types::{Message, ModelResponse, StepId};

use crate::{ModelClient, ModelError, ModelRequest};

/// A request as the client observed it, captured for assertions.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub agent: String,
    pub step: StepId,
    pub messages: Vec<Message>,
}

/// Replays a fixed script of outcomes in order.
///
/// Running off the end of the script is reported as a transport error
/// rather than a panic so that a miscounted test fails with a readable
/// session error.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    script: VecDeque<Result<ModelResponse, ModelError>>,
    captured: Vec<CapturedRequest>,
}

impl ScriptedClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful plain-text response.
    pub fn push_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.script
            .push_back(Ok(ModelResponse::PlainText(text.into())));
        self
    }

    /// Queue an arbitrary outcome.
    pub fn push_outcome(&mut self, outcome: Result<ModelResponse, ModelError>) -> &mut Self {
        self.script.push_back(outcome);
        self
    }

    /// Requests observed so far, in order.
    #[must_use]
    pub fn captured(&self) -> &[CapturedRequest] {
        &self.captured
    }

    /// Number of requests the client has answered.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.captured.len()
    }

    /// True when every scripted outcome has been consumed.
    #[must_use]
    pub fn exhausted(&self) -> bool {
        self.script.is_empty()
    }
}

impl ModelClient for ScriptedClient {
    async fn send(&mut self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        tracing::debug!(agent = request.agent, step = %request.step, "scripted send");
        self.captured.push(CapturedRequest {
            agent: request.agent.to_string(),
            step: request.step,
            messages: request.messages.to_vec(),
        });
        self.script
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::Transport("script exhausted".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use mend_types::{Message, StepId};

    use super::ScriptedClient;
    use crate::{ModelClient, ModelError, ModelRequest};

    #[tokio::test]
    async fn replays_script_in_order_then_errors() {
        let mut client = ScriptedClient::new();
        client.push_text("first").push_text("second");

        let messages = vec![Message::try_system("sys").unwrap()];
        let request = ModelRequest {
            messages: &messages,
            agent: "tester",
            step: StepId::new(1),
        };

        assert_eq!(client.send(request).await.unwrap().render(), "first");
        assert_eq!(client.send(request).await.unwrap().render(), "second");
        assert_eq!(
            client.send(request).await.unwrap_err(),
            ModelError::Transport("script exhausted".to_string())
        );
        assert_eq!(client.calls(), 3);
        assert_eq!(client.captured()[0].messages.len(), 1);
    }
}
