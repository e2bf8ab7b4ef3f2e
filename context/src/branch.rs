//! Named conversation branches.
//!
//! A branch is an independent snapshot of a log's message list, taken so an
//! alternative continuation can be explored without losing the main line.
//! Snapshots are copies: mutating the live log never changes a saved
//! branch, and loading a branch never aliases its storage.

use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

use crate::log::{ConversationLog, RestoreError};

#[derive(Debug, Error)]
pub enum BranchError {
    #[error("unknown branch: {0}")]
    Unknown(String),
    #[error("branch snapshot is corrupt: {0}")]
    Corrupt(#[from] RestoreError),
}

/// In-memory table of named message-list snapshots.
#[derive(Debug, Default)]
pub struct BranchTable {
    branches: HashMap<String, Vec<mend_types::Message>>,
}

impl BranchTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the log under `name`, generating a name when none is given.
    /// Returns the name the snapshot was stored under.
    pub fn save(&mut self, name: Option<String>, log: &ConversationLog) -> String {
        let name = name.unwrap_or_else(|| Uuid::new_v4().to_string());
        self.branches.insert(name.clone(), log.snapshot());
        name
    }

    /// Replace the live log's messages with an independent copy of the
    /// named snapshot.
    pub fn load(&self, name: &str, log: &mut ConversationLog) -> Result<(), BranchError> {
        let snapshot = self
            .branches
            .get(name)
            .ok_or_else(|| BranchError::Unknown(name.to_string()))?;
        log.restore(snapshot.clone())?;
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.branches.contains_key(name)
    }

    /// Branch names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.branches.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use mend_types::NonEmptyString;

    use super::{BranchError, BranchTable};
    use crate::log::ConversationLog;

    fn log() -> ConversationLog {
        ConversationLog::new(NonEmptyString::new("system").unwrap())
    }

    #[test]
    fn save_and_load_round_trip() {
        let mut log = log();
        log.append_user(NonEmptyString::new("first").unwrap());

        let mut branches = BranchTable::new();
        let name = branches.save(Some("main".to_string()), &log);
        assert_eq!(name, "main");

        log.append_user(NonEmptyString::new("second").unwrap());
        branches.load("main", &mut log).expect("load");
        assert_eq!(log.len(), 2);
        assert_eq!(log.messages()[1].content(), "first");
    }

    #[test]
    fn generated_names_are_unique() {
        let log = log();
        let mut branches = BranchTable::new();
        let a = branches.save(None, &log);
        let b = branches.save(None, &log);
        assert_ne!(a, b);
        assert!(branches.contains(&a));
        assert!(branches.contains(&b));
    }

    #[test]
    fn snapshots_are_independent_of_the_live_log() {
        let mut log = log();
        log.append_user(NonEmptyString::new("original").unwrap());

        let mut branches = BranchTable::new();
        branches.save(Some("keep".to_string()), &log);

        // Mutate the live log after saving.
        log.truncate(1);
        log.append_user(NonEmptyString::new("replaced").unwrap());

        branches.load("keep", &mut log).expect("load");
        assert_eq!(log.messages()[1].content(), "original");
    }

    #[test]
    fn unknown_branch_is_an_error() {
        let mut log = log();
        let branches = BranchTable::new();
        match branches.load("missing", &mut log) {
            Err(BranchError::Unknown(name)) => assert_eq!(name, "missing"),
            other => panic!("expected unknown-branch error, got {other:?}"),
        }
    }
}
