//! The propose → validate → retry → fallback edit protocol.
//!
//! An [`EditSession`] drives one file edit against a conversation session:
//! ask the model for old/new block pairs, apply them with the patch engine,
//! feed localization failures back as corrective instructions, and after
//! the retry budget is spent ask once for a full-file rewrite. Whatever
//! happens, the target file is either updated exactly once or left in its
//! last-known-good state; partial application is never observable.
//!
//! The protocol is an explicit state machine: each transition is a plain
//! return value, not a thrown-and-caught condition.

use mend_context::CheckpointStore;
use mend_providers::ModelClient;
use mend_types::{BlockPair, NonEmptyString};
use similar::{ChangeTag, TextDiff};
use thiserror::Error;

use crate::blocks;
use crate::files::{FileBody, FileError, SourceFile, Workspace};
use crate::patch;
use crate::session::{ConversationSession, SessionError};

/// Retry budgets for one run.
#[derive(Debug, Clone, Copy)]
pub struct EditConfig {
    /// Failed pair-application attempts before the fallback rewrite.
    pub max_pair_attempts: u32,
    /// Malformed (odd-block) responses tolerated before the fallback.
    /// Malformed responses do not consume a pair-application try.
    pub max_malformed_attempts: u32,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            max_pair_attempts: 5,
            max_malformed_attempts: 5,
        }
    }
}

/// How a run ended. Every variant leaves the workspace consistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// The patched content was written to the target file.
    Applied { content: String },
    /// The model proposed no changes; nothing was written.
    NoChangesNeeded,
    /// Patching succeeded but reproduced the original content; nothing was
    /// written.
    Unchanged,
    /// Retries and the fallback both failed; the file is untouched.
    GaveUp { warning: String },
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    File(#[from] FileError),
}

/// One round of the protocol. Lives only for the duration of a `run` call.
#[derive(Debug)]
struct EditAttempt {
    attempt: u32,
    content: String,
    applied: bool,
}

/// Protocol states. `Retrying` carries the corrective text to send;
/// `Applying` carries the response to validate.
#[derive(Debug)]
enum EditState {
    Drafting,
    Applying { response: String },
    Retrying { error: String },
    FallbackRewrite,
}

/// What the state loop settled on, before file IO and log cleanup.
#[derive(Debug)]
enum Completion {
    Patched(String),
    NoChanges,
    GaveUp,
}

pub struct EditSession<'a, C, S> {
    convo: &'a mut ConversationSession<C, S>,
    workspace: &'a Workspace,
    config: EditConfig,
}

impl<'a, C: ModelClient, S: CheckpointStore> EditSession<'a, C, S> {
    pub fn new(convo: &'a mut ConversationSession<C, S>, workspace: &'a Workspace) -> Self {
        Self {
            convo,
            workspace,
            config: EditConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: EditConfig) -> Self {
        self.config = config;
        self
    }

    /// Implement `description` in the file at `target` (workspace-relative
    /// path).
    ///
    /// On completion via any path, every request/response pair this run
    /// exchanged is truncated from the conversation log, so the visible
    /// history carries no retry noise.
    pub async fn run(mut self, target: &str, description: &str) -> Result<EditOutcome, EditError> {
        let files = self.workspace.list_all()?;
        let original = self.target_content(target, &files)?;

        let mut exchanged = 0usize;
        let mut pair_attempts: u32 = 0;
        let mut malformed_attempts: u32 = 0;
        let mut state = EditState::Drafting;

        let completion = loop {
            state = match state {
                EditState::Drafting => {
                    let response = self
                        .send(draft_prompt(target, description, &original), &files, &mut exchanged)
                        .await?;
                    EditState::Applying { response }
                }
                EditState::Applying { response } => {
                    let segments = blocks::code_blocks(&response);
                    if segments.is_empty() {
                        tracing::info!(file = target, "no changes required");
                        break Completion::NoChanges;
                    }
                    match blocks::block_pairs(segments) {
                        Err(err) => {
                            malformed_attempts += 1;
                            if malformed_attempts >= self.config.max_malformed_attempts {
                                EditState::FallbackRewrite
                            } else {
                                EditState::Retrying {
                                    error: err.to_string(),
                                }
                            }
                        }
                        Ok(pairs) => {
                            let attempt =
                                attempt_patch(pair_attempts + 1, &original, &pairs);
                            match attempt {
                                Ok(attempt) => break Completion::Patched(attempt.content),
                                Err(err) => {
                                    pair_attempts += 1;
                                    if pair_attempts >= self.config.max_pair_attempts {
                                        EditState::FallbackRewrite
                                    } else {
                                        EditState::Retrying {
                                            error: err.to_string(),
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
                EditState::Retrying { error } => {
                    let response = self
                        .send(corrective_prompt(&error), &files, &mut exchanged)
                        .await?;
                    EditState::Applying { response }
                }
                EditState::FallbackRewrite => {
                    let response = self
                        .send(
                            fallback_prompt(target, description, &original),
                            &files,
                            &mut exchanged,
                        )
                        .await?;
                    let mut segments = blocks::code_blocks(&response);
                    if segments.len() == 1 {
                        break Completion::Patched(segments.remove(0));
                    }
                    break Completion::GaveUp;
                }
            };
        };

        // Retry noise (and the final exchange itself) never outlives the
        // run in the visible conversation.
        self.convo.truncate(exchanged);

        match completion {
            Completion::NoChanges => Ok(EditOutcome::NoChangesNeeded),
            Completion::GaveUp => {
                let warning = format!(
                    "Unable to implement code changes after {} retries and a fallback: {description}",
                    self.config.max_pair_attempts
                );
                tracing::warn!(file = target, "{warning}");
                Ok(EditOutcome::GaveUp { warning })
            }
            Completion::Patched(content) if content == original => Ok(EditOutcome::Unchanged),
            Completion::Patched(content) => {
                let (added, removed) = diff_stats(&original, &content);
                self.workspace.write(target, &content)?;
                tracing::info!(file = target, added, removed, "file updated");
                Ok(EditOutcome::Applied { content })
            }
        }
    }

    /// Ask the model which files a change description concerns. Returns
    /// the listed paths, one per fenced-block line.
    pub async fn identify_target_files(
        &mut self,
        description: &str,
    ) -> Result<Vec<String>, EditError> {
        let files = self.workspace.list_all()?;
        let mut exchanged = 0usize;
        let response = self
            .send(identify_prompt(description, &files), &files, &mut exchanged)
            .await?;
        self.convo.truncate(exchanged);

        let mut paths = Vec::new();
        for block in blocks::code_blocks(&response) {
            for line in block.lines() {
                let line = line.trim();
                if !line.is_empty() {
                    paths.push(line.to_string());
                }
            }
        }
        Ok(paths)
    }

    async fn send(
        &mut self,
        prompt: String,
        files: &[SourceFile],
        exchanged: &mut usize,
    ) -> Result<String, SessionError> {
        let prompt = NonEmptyString::new(prompt).expect("prompts are statically non-empty");
        let response = self.convo.send(prompt, files).await?;
        *exchanged += 2;
        Ok(response)
    }

    /// Current content of the target file: prefer the listed snapshot,
    /// fall back to a direct read (path normalization differences), and
    /// render binary files as the marker so they are never patched into
    /// garbage.
    fn target_content(&self, target: &str, files: &[SourceFile]) -> Result<String, FileError> {
        if let Some(file) = files.iter().find(|f| f.qualified_path() == target) {
            return Ok(file.content.clone());
        }
        match self.workspace.read(target)? {
            FileBody::Text(content) => Ok(content),
            FileBody::Binary => Ok(crate::files::BINARY_MARKER.to_string()),
        }
    }
}

fn attempt_patch(
    attempt: u32,
    original: &str,
    pairs: &[BlockPair],
) -> Result<EditAttempt, patch::MatchError> {
    // Each attempt patches a fresh copy of the original; a failed attempt
    // leaves nothing behind.
    let result = patch::apply(original, pairs);
    match result {
        Ok(content) => {
            let attempt = EditAttempt {
                attempt,
                content,
                applied: true,
            };
            tracing::debug!(attempt.attempt, applied = attempt.applied, "patch attempt");
            Ok(attempt)
        }
        Err(err) => {
            tracing::debug!(attempt, applied = false, "patch attempt failed: {err}");
            Err(err)
        }
    }
}

fn draft_prompt(target: &str, description: &str, content: &str) -> String {
    format!(
        "Implement the following change in the file **{target}**.\n\n\
         {description}\n\n\
         **{target}**:\n```\n{content}\n```\n\n\
         Reply with the edits as pairs of fenced code blocks: for each \
         change, first the exact old code being replaced, then the new \
         code. Reply without any code blocks if no change is needed."
    )
}

fn corrective_prompt(error: &str) -> String {
    format!(
        "There was a problem with your previous response:\n\n{error}\n\n\
         Resend the edits, each change as an old code block followed by a \
         new code block."
    )
}

fn fallback_prompt(target: &str, description: &str, content: &str) -> String {
    format!(
        "The incremental edits could not be applied. Reply with the \
         complete updated content of **{target}** in a single fenced code \
         block, implementing this change:\n\n{description}\n\n\
         **{target}**:\n```\n{content}\n```"
    )
}

fn identify_prompt(description: &str, files: &[SourceFile]) -> String {
    let mut listing = String::new();
    for file in files {
        listing.push_str("- ");
        listing.push_str(&file.qualified_path());
        listing.push('\n');
    }
    format!(
        "Which of these files need to change to implement the following?\n\n\
         {description}\n\n\
         Files:\n{listing}\n\
         Reply with the relevant paths, one per line, in a single fenced \
         code block."
    )
}

fn diff_stats(old: &str, new: &str) -> (usize, usize) {
    let diff = TextDiff::from_lines(old, new);
    let mut added = 0;
    let mut removed = 0;
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => added += 1,
            ChangeTag::Delete => removed += 1,
            ChangeTag::Equal => {}
        }
    }
    (added, removed)
}
