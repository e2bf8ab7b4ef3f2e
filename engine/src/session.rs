//! Conversation session driving one agent's dialogue with the model.
//!
//! A [`ConversationSession`] owns the conversation log, its branch table,
//! the step counter, and the two collaborators (model client, checkpoint
//! store). Every exchange is checkpointed; in replay mode the persisted
//! records answer instead of the model, which is what makes a recorded
//! session debuggable and resumable step by step.

use std::fmt::Write as _;

use mend_context::{
    BranchError, BranchTable, CheckpointRecord, CheckpointStore, ConversationLog, RestoreError,
    StoreError,
};
use mend_providers::{ModelClient, ModelError, ModelRequest};
use mend_types::{NonEmptyString, StepId};
use thiserror::Error;

use crate::files::SourceFile;
use crate::process::ProcessRegistry;

/// Whether sends are answered from the checkpoint store or the live model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayMode {
    Disabled,
    /// Answer from persisted records. With `stop_at` set, replay switches
    /// off at that step and the abandoned tail after it is pruned; replay
    /// also switches off by itself when the records run out.
    Replay { stop_at: Option<StepId> },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("persisted step is corrupt: {0}")]
    Restore(#[from] RestoreError),
}

pub struct ConversationSession<C, S> {
    client: C,
    store: S,
    log: ConversationLog,
    branches: BranchTable,
    agent: String,
    replay: ReplayMode,
    last_step: StepId,
}

impl<C: ModelClient, S: CheckpointStore> ConversationSession<C, S> {
    pub fn new(client: C, store: S, agent: impl Into<String>, system: NonEmptyString) -> Self {
        Self {
            client,
            store,
            log: ConversationLog::new(system),
            branches: BranchTable::new(),
            agent: agent.into(),
            replay: ReplayMode::Disabled,
            last_step: StepId::new(0),
        }
    }

    #[must_use]
    pub fn with_replay(mut self, replay: ReplayMode) -> Self {
        self.replay = replay;
        self
    }

    #[must_use]
    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    #[must_use]
    pub fn agent(&self) -> &str {
        &self.agent
    }

    /// Step id of the most recent exchange.
    #[must_use]
    pub fn last_step(&self) -> StepId {
        self.last_step
    }

    #[must_use]
    pub fn replay_mode(&self) -> ReplayMode {
        self.replay
    }

    #[must_use]
    pub fn client(&self) -> &C {
        &self.client
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Drop the last `n` exchanged messages (the system head always stays).
    pub fn truncate(&mut self, n: usize) {
        self.log.truncate(n);
    }

    pub fn save_branch(&mut self, name: Option<String>) -> String {
        self.branches.save(name, &self.log)
    }

    /// Load a branch snapshot and re-substitute current file contents so
    /// the restored turns are not stale.
    pub fn load_branch(&mut self, name: &str, files: &[SourceFile]) -> Result<(), BranchError> {
        // Split-borrow: the branch table is read while the log is rewritten.
        let Self { branches, log, .. } = self;
        branches.load(name, log)?;
        substitute(log, files);
        Ok(())
    }

    /// Send `prompt` as the next user turn and return the rendered
    /// response text (already appended to the log as the assistant turn).
    ///
    /// Live exchanges are persisted before the response enters the log; a
    /// context-limit failure is persisted too, then propagated unretried.
    /// An empty response is a fatal transport failure.
    pub async fn send(
        &mut self,
        prompt: NonEmptyString,
        files: &[SourceFile],
    ) -> Result<String, SessionError> {
        self.log.append_user(prompt);
        let step = self.last_step.next();
        self.last_step = step;

        if let ReplayMode::Replay { stop_at } = self.replay {
            match self.store.get(step)? {
                Some(record) => return self.replay_step(step, stop_at, record),
                None => {
                    // Ran past the recorded history; continue live.
                    tracing::info!(%step, "no persisted step, leaving replay mode");
                    self.replay = ReplayMode::Disabled;
                }
            }
        }

        substitute(&mut self.log, files);

        let request = ModelRequest {
            messages: self.log.messages(),
            agent: &self.agent,
            step,
        };
        let response = match self.client.send(request).await {
            Ok(response) => response,
            Err(ModelError::LimitExceeded(detail)) => {
                // Persist the failure so replay reproduces it, then give up.
                self.store.save(&CheckpointRecord::limit_failure(
                    step,
                    self.log.snapshot(),
                    detail.as_str(),
                ))?;
                return Err(ModelError::LimitExceeded(detail).into());
            }
            Err(other) => return Err(other.into()),
        };

        if response.is_empty() {
            return Err(ModelError::EmptyResponse.into());
        }
        let rendered = response.render();

        self.store
            .save(&CheckpointRecord::exchange(
                step,
                self.log.snapshot(),
                rendered.as_str(),
            ))?;

        self.append_assistant(&rendered);
        Ok(rendered)
    }

    fn replay_step(
        &mut self,
        step: StepId,
        stop_at: Option<StepId>,
        record: CheckpointRecord,
    ) -> Result<String, SessionError> {
        tracing::info!(%step, "restoring persisted step");
        self.log.restore(record.messages)?;

        if stop_at == Some(step) {
            self.replay = ReplayMode::Disabled;
            self.store.delete_subsequent(step)?;
        }

        if let Some(limit) = record.limit_exceeded {
            return Err(ModelError::LimitExceeded(limit).into());
        }
        if record.response.trim().is_empty() {
            return Err(ModelError::EmptyResponse.into());
        }

        self.append_assistant(&record.response);
        Ok(record.response)
    }

    fn append_assistant(&mut self, rendered: &str) {
        if let Ok(content) = NonEmptyString::new(rendered) {
            self.log.append_assistant(content);
        }
    }
}

fn substitute(log: &mut ConversationLog, files: &[SourceFile]) {
    log.substitute_file_contents(|path| {
        files
            .iter()
            .find(|file| file.qualified_path() == path)
            .map(|file| file.content.clone())
    });
}

/// Render the workspace and process state for a context prompt: the file
/// listing in deterministic order, then any running processes.
#[must_use]
pub fn environment_summary(files: &[SourceFile], processes: &ProcessRegistry) -> String {
    let mut out = String::from("Workspace files:\n");
    for file in files {
        let _ = writeln!(out, "- {}", file.qualified_path());
    }
    if !processes.is_empty() {
        out.push_str("\nRunning processes:\n");
        for (name, command) in processes.snapshot() {
            let _ = writeln!(out, "- {name}: {command}");
        }
    }
    out
}
