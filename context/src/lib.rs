//! Conversation state for the Mend engine.
//!
//! A [`ConversationLog`] owns one agent's ordered message history and keeps
//! the system prompt pinned at the head. [`BranchTable`] holds named,
//! independent snapshots of a log for exploring alternative continuations.
//! [`checkpoint`] persists per-step exchange records so a session can be
//! replayed deterministically. [`template`] rewrites fenced file blocks in
//! user messages so historical turns always show the current file contents.

mod branch;
pub mod checkpoint;
mod log;
pub mod template;

pub use branch::{BranchError, BranchTable};
pub use checkpoint::{CheckpointRecord, CheckpointStore, NullStore, SqliteCheckpointStore, StoreError};
pub use log::{ConversationLog, RestoreError};
