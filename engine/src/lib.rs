//! Conversation replay and patch engine.
//!
//! This crate is the orchestration layer of Mend: it drives one agent's
//! dialogue with a model ([`ConversationSession`]), turns proposed old/new
//! block pairs into safe file edits ([`EditSession`] over [`patch`]), and
//! keeps every exchange checkpointed so a session can be replayed
//! deterministically.
//!
//! # Invariants
//!
//! - A failed patch application never mutates the caller's content; a
//!   terminal edit failure leaves every file in its last-known-good state.
//! - An edit localizes exactly once or not at all: ambiguous needles are
//!   refused, never guessed at.
//! - The conversation log's system head survives every truncation, branch
//!   load and replay restore.

pub mod blocks;
pub mod edit;
pub mod files;
pub mod patch;
pub mod process;
pub mod session;

pub use edit::{EditConfig, EditError, EditOutcome, EditSession};
pub use files::{BINARY_MARKER, FileBody, FileError, SourceFile, Workspace};
pub use patch::{MatchError, ResolvedMatch};
pub use process::ProcessRegistry;
pub use session::{ConversationSession, ReplayMode, SessionError, environment_summary};
