//! Checkpoint persistence for deterministic replay.
//!
//! Every model exchange is persisted as a [`CheckpointRecord`] keyed by its
//! step id: the full message list as it was sent, the raw response text,
//! and an optional limit-exceeded marker. Replaying a session reads the
//! records back in step order and never touches the model.
//!
//! # Key invariant
//!
//! A `save` is atomic per step id. Two sessions must never race to write
//! the same id; the step id is the table's primary key and each write is a
//! single transaction.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use mend_types::{Message, StepId};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

/// The exact shape the store round-trips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointRecord {
    pub step: StepId,
    /// The ordered message list at send time (response not yet appended).
    pub messages: Vec<Message>,
    /// Raw response text; empty when the exchange failed on a limit error.
    pub response: String,
    /// Set when the exchange ended with a context-limit failure; replay
    /// re-raises it instead of producing a response.
    pub limit_exceeded: Option<String>,
}

impl CheckpointRecord {
    /// Record a completed exchange.
    #[must_use]
    pub fn exchange(step: StepId, messages: Vec<Message>, response: impl Into<String>) -> Self {
        Self {
            step,
            messages,
            response: response.into(),
            limit_exceeded: None,
        }
    }

    /// Record an exchange that died on a context-limit failure.
    #[must_use]
    pub fn limit_failure(step: StepId, messages: Vec<Message>, error: impl Into<String>) -> Self {
        Self {
            step,
            messages,
            response: String::new(),
            limit_exceeded: Some(error.into()),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("checkpoint database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("checkpoint record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Load/save/prune contract the engine depends on. In normal operation the
/// store is write-only; `get` is consulted only in replay mode.
pub trait CheckpointStore {
    fn get(&self, step: StepId) -> Result<Option<CheckpointRecord>, StoreError>;

    fn save(&mut self, record: &CheckpointRecord) -> Result<(), StoreError>;

    /// Delete every record with a step id greater than `step`. Returns the
    /// number of records removed.
    fn delete_subsequent(&mut self, step: StepId) -> Result<u64, StoreError>;
}

/// A store that remembers nothing. Used when checkpointing is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl CheckpointStore for NullStore {
    fn get(&self, _step: StepId) -> Result<Option<CheckpointRecord>, StoreError> {
        Ok(None)
    }

    fn save(&mut self, _record: &CheckpointRecord) -> Result<(), StoreError> {
        Ok(())
    }

    fn delete_subsequent(&mut self, _step: StepId) -> Result<u64, StoreError> {
        Ok(0)
    }
}

/// SQLite-backed checkpoint store.
pub struct SqliteCheckpointStore {
    db: Connection,
}

impl SqliteCheckpointStore {
    const SCHEMA: &'static str = "
        CREATE TABLE IF NOT EXISTS checkpoints (
            step_id INTEGER PRIMARY KEY,
            messages TEXT NOT NULL,
            response TEXT NOT NULL,
            limit_exceeded TEXT,
            created_at INTEGER NOT NULL
        );
    ";

    /// Open or create the store database at the given path.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let db = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        Self::initialize(db)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::initialize(db)
    }

    fn initialize(db: Connection) -> anyhow::Result<Self> {
        db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL;")
            .context("Failed to set pragmas")?;
        db.execute_batch(Self::SCHEMA)
            .context("Failed to create schema")?;
        Ok(Self { db })
    }

    /// Highest step id currently persisted.
    pub fn latest_step(&self) -> Result<Option<StepId>, StoreError> {
        let latest: Option<i64> = self
            .db
            .query_row("SELECT MAX(step_id) FROM checkpoints", [], |row| row.get(0))
            .optional()?
            .flatten();
        Ok(latest.map(StepId::new))
    }
}

impl CheckpointStore for SqliteCheckpointStore {
    fn get(&self, step: StepId) -> Result<Option<CheckpointRecord>, StoreError> {
        let row: Option<(String, String, Option<String>)> = self
            .db
            .query_row(
                "SELECT messages, response, limit_exceeded
                 FROM checkpoints WHERE step_id = ?1",
                params![step.value()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((messages, response, limit_exceeded)) = row else {
            return Ok(None);
        };

        let messages: Vec<Message> = serde_json::from_str(&messages)?;
        Ok(Some(CheckpointRecord {
            step,
            messages,
            response,
            limit_exceeded,
        }))
    }

    fn save(&mut self, record: &CheckpointRecord) -> Result<(), StoreError> {
        let messages = serde_json::to_string(&record.messages)?;
        let created_at = epoch_millis();

        let tx = self.db.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO checkpoints
                 (step_id, messages, response, limit_exceeded, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.step.value(),
                messages,
                record.response,
                record.limit_exceeded,
                created_at
            ],
        )?;
        tx.commit()?;

        tracing::debug!(step = %record.step, "checkpoint saved");
        Ok(())
    }

    fn delete_subsequent(&mut self, step: StepId) -> Result<u64, StoreError> {
        let deleted = self.db.execute(
            "DELETE FROM checkpoints WHERE step_id > ?1",
            params![step.value()],
        )?;
        if deleted > 0 {
            tracing::info!(after = %step, deleted, "pruned abandoned checkpoint tail");
        }
        Ok(deleted as u64)
    }
}

fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use mend_types::{Message, StepId};

    use super::{CheckpointRecord, CheckpointStore, NullStore, SqliteCheckpointStore};

    fn record(step: i64) -> CheckpointRecord {
        CheckpointRecord::exchange(
            StepId::new(step),
            vec![
                Message::try_system("system").unwrap(),
                Message::try_user("change the greeting").unwrap(),
            ],
            format!("response {step}"),
        )
    }

    #[test]
    fn round_trips_a_record() {
        let mut store = SqliteCheckpointStore::open_in_memory().unwrap();
        let rec = record(1);
        store.save(&rec).unwrap();

        let loaded = store.get(StepId::new(1)).unwrap().expect("record");
        assert_eq!(loaded, rec);
    }

    #[test]
    fn round_trips_a_limit_failure() {
        let mut store = SqliteCheckpointStore::open_in_memory().unwrap();
        let rec = CheckpointRecord::limit_failure(
            StepId::new(3),
            vec![Message::try_system("system").unwrap()],
            "context window exhausted at 128000 tokens",
        );
        store.save(&rec).unwrap();

        let loaded = store.get(StepId::new(3)).unwrap().expect("record");
        assert_eq!(
            loaded.limit_exceeded.as_deref(),
            Some("context window exhausted at 128000 tokens")
        );
        assert!(loaded.response.is_empty());
    }

    #[test]
    fn missing_step_is_none() {
        let store = SqliteCheckpointStore::open_in_memory().unwrap();
        assert!(store.get(StepId::new(42)).unwrap().is_none());
    }

    #[test]
    fn save_overwrites_same_step() {
        let mut store = SqliteCheckpointStore::open_in_memory().unwrap();
        store.save(&record(1)).unwrap();

        let mut updated = record(1);
        updated.response = "rewritten".to_string();
        store.save(&updated).unwrap();

        let loaded = store.get(StepId::new(1)).unwrap().expect("record");
        assert_eq!(loaded.response, "rewritten");
    }

    #[test]
    fn delete_subsequent_prunes_strictly_after() {
        let mut store = SqliteCheckpointStore::open_in_memory().unwrap();
        for step in 1..=5 {
            store.save(&record(step)).unwrap();
        }

        let deleted = store.delete_subsequent(StepId::new(3)).unwrap();
        assert_eq!(deleted, 2);
        assert!(store.get(StepId::new(3)).unwrap().is_some());
        assert!(store.get(StepId::new(4)).unwrap().is_none());
        assert_eq!(store.latest_step().unwrap(), Some(StepId::new(3)));
    }

    #[test]
    fn persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("steps.db");

        {
            let mut store = SqliteCheckpointStore::open(&path).unwrap();
            store.save(&record(1)).unwrap();
        }

        let store = SqliteCheckpointStore::open(&path).unwrap();
        let loaded = store.get(StepId::new(1)).unwrap().expect("record");
        assert_eq!(loaded.response, "response 1");
    }

    #[test]
    fn null_store_remembers_nothing() {
        let mut store = NullStore;
        store.save(&record(1)).unwrap();
        assert!(store.get(StepId::new(1)).unwrap().is_none());
        assert_eq!(store.delete_subsequent(StepId::new(0)).unwrap(), 0);
    }
}
