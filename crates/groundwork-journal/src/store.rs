//! Journal store trait and the in-memory implementation.

use std::sync::Arc;

use async_trait::async_trait;
use groundwork_core::{GroundworkError, Result};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::entry::JournalEntry;

/// Append-only persisted record of a run's progress.
///
/// One store instance belongs to exactly one run; appends from concurrent
/// node tasks within that run must be safe.
#[async_trait]
pub trait JournalStore: Send + Sync {
    /// Append an entry. The entry is durable before this returns.
    /// Fails with `RunClosed` once the run is finalized.
    async fn append(&self, entry: JournalEntry) -> Result<()>;

    /// All entries in append order, for startup reconstruction.
    async fn read_all(&self) -> Result<Vec<JournalEntry>>;

    /// Mark the run archived. No further appends are accepted.
    async fn finalize(&self) -> Result<()>;

    /// Whether the run has been archived.
    async fn is_closed(&self) -> bool;
}

/// In-memory journal, used for tests and ephemeral runs.
pub struct InMemoryJournal {
    run_id: Uuid,
    entries: Arc<RwLock<Vec<JournalEntry>>>,
    closed: Arc<RwLock<bool>>,
}

impl InMemoryJournal {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            entries: Arc::new(RwLock::new(Vec::new())),
            closed: Arc::new(RwLock::new(false)),
        }
    }

    /// Rebuild a journal from previously recorded entries, as a crash
    /// recovery would.
    pub fn with_entries(run_id: Uuid, entries: Vec<JournalEntry>) -> Self {
        Self {
            run_id,
            entries: Arc::new(RwLock::new(entries)),
            closed: Arc::new(RwLock::new(false)),
        }
    }
}

#[async_trait]
impl JournalStore for InMemoryJournal {
    async fn append(&self, entry: JournalEntry) -> Result<()> {
        let closed = self.closed.read().await;
        if *closed {
            return Err(GroundworkError::RunClosed {
                run_id: self.run_id,
            });
        }

        let mut entries = self.entries.write().await;
        entries.push(entry);
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<JournalEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.clone())
    }

    async fn finalize(&self) -> Result<()> {
        let mut closed = self.closed.write().await;
        if *closed {
            return Err(GroundworkError::RunClosed {
                run_id: self.run_id,
            });
        }
        *closed = true;

        tracing::info!(run_id = %self.run_id, "journal archived");
        Ok(())
    }

    async fn is_closed(&self) -> bool {
        *self.closed.read().await
    }
}
