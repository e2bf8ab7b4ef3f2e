//! Registry of long-running processes started on the user's behalf.
//!
//! Passed explicitly to whatever needs to report running processes (the
//! environment summary); there is no ambient global.

use std::collections::BTreeMap;

/// Named commands currently running. Ordered by name for deterministic
/// rendering.
#[derive(Debug, Default, Clone)]
pub struct ProcessRegistry {
    processes: BTreeMap<String, String>,
}

impl ProcessRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, command: impl Into<String>) {
        self.processes.insert(name.into(), command.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.processes.remove(name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// (name, command) pairs in name order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.processes
            .iter()
            .map(|(name, command)| (name.clone(), command.clone()))
            .collect()
    }
}
