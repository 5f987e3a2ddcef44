//! File-backed journal: one line-delimited JSON record per entry.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use groundwork_core::{GroundworkError, Result};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::entry::JournalEntry;
use crate::store::JournalStore;

/// Durable journal persisted as line-delimited JSON.
///
/// Appends are synced to disk before returning; `finalize` renames the log
/// to `<path>.archived` so a later run with the same identity starts fresh.
pub struct FileJournal {
    run_id: Uuid,
    path: PathBuf,
    // Serializes writers; one open handle per append keeps recovery simple.
    write_lock: Mutex<()>,
    closed: Mutex<bool>,
}

impl FileJournal {
    /// Open (or create) the journal at `path`.
    pub async fn open(run_id: Uuid, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| GroundworkError::JournalError {
                    message: format!("create journal dir: {}", e),
                })?;
        }

        Ok(Self {
            run_id,
            path,
            write_lock: Mutex::new(()),
            closed: Mutex::new(false),
        })
    }

    /// Read every replayable entry from an existing journal file.
    ///
    /// A trailing partial line (torn write from a crash mid-append) is
    /// skipped with a warning rather than failing the whole replay.
    pub async fn replay(path: impl AsRef<Path>) -> Result<Vec<JournalEntry>> {
        let path = path.as_ref();
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(GroundworkError::JournalError {
                    message: format!("read journal {}: {}", path.display(), e),
                })
            }
        };

        let mut entries = Vec::new();
        for (line_no, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<JournalEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        line = line_no + 1,
                        error = %e,
                        "skipping unreadable journal line (torn write?)"
                    );
                    break;
                }
            }
        }
        Ok(entries)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl JournalStore for FileJournal {
    async fn append(&self, entry: JournalEntry) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if *self.closed.lock().await {
            return Err(GroundworkError::RunClosed {
                run_id: self.run_id,
            });
        }

        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| GroundworkError::JournalError {
                message: format!("open journal {}: {}", self.path.display(), e),
            })?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| GroundworkError::JournalError {
                message: format!("append journal entry: {}", e),
            })?;
        file.flush()
            .await
            .map_err(|e| GroundworkError::JournalError {
                message: format!("flush journal: {}", e),
            })?;
        // Durable before returning.
        file.sync_data()
            .await
            .map_err(|e| GroundworkError::JournalError {
                message: format!("sync journal: {}", e),
            })?;

        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<JournalEntry>> {
        Self::replay(&self.path).await
    }

    async fn finalize(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut closed = self.closed.lock().await;
        if *closed {
            return Err(GroundworkError::RunClosed {
                run_id: self.run_id,
            });
        }

        let archived = self.path.with_extension("archived");
        tokio::fs::rename(&self.path, &archived)
            .await
            .map_err(|e| GroundworkError::JournalError {
                message: format!("archive journal {}: {}", self.path.display(), e),
            })?;
        *closed = true;

        tracing::info!(run_id = %self.run_id, archived = %archived.display(), "journal archived");
        Ok(())
    }

    async fn is_closed(&self) -> bool {
        *self.closed.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundwork_core::{NodeId, NodeState};

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join("groundwork-journal-tests")
            .join(format!("{}-{}.journal", name, Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_append_then_replay_roundtrip() {
        let run_id = Uuid::new_v4();
        let path = scratch_path("roundtrip");
        let journal = FileJournal::open(run_id, &path).await.unwrap();

        let started = JournalEntry::run_started(run_id, "fp".to_string(), "local".to_string());
        let submitted = JournalEntry::transition(
            run_id,
            NodeId::new("m", "a", "create"),
            NodeState::Submitted,
        );
        journal.append(started.clone()).await.unwrap();
        journal.append(submitted.clone()).await.unwrap();

        let replayed = journal.read_all().await.unwrap();
        assert_eq!(replayed, vec![started, submitted]);

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_replay_missing_file_is_empty() {
        let path = scratch_path("missing");
        let entries = FileJournal::replay(&path).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_replay_skips_torn_trailing_line() {
        let run_id = Uuid::new_v4();
        let path = scratch_path("torn");
        let journal = FileJournal::open(run_id, &path).await.unwrap();

        let entry = JournalEntry::run_started(run_id, "fp".to_string(), "local".to_string());
        journal.append(entry.clone()).await.unwrap();

        // Simulate a crash mid-append.
        let mut raw = tokio::fs::read_to_string(&path).await.unwrap();
        raw.push_str("{\"kind\":\"node_tran");
        tokio::fs::write(&path, raw).await.unwrap();

        let replayed = FileJournal::replay(&path).await.unwrap();
        assert_eq!(replayed, vec![entry]);

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_finalize_archives_and_closes() {
        let run_id = Uuid::new_v4();
        let path = scratch_path("archive");
        let journal = FileJournal::open(run_id, &path).await.unwrap();

        journal
            .append(JournalEntry::run_started(
                run_id,
                "fp".to_string(),
                "local".to_string(),
            ))
            .await
            .unwrap();
        journal.finalize().await.unwrap();

        assert!(journal.is_closed().await);
        assert!(!path.exists());
        let archived = path.with_extension("archived");
        assert!(archived.exists());

        let err = journal
            .append(JournalEntry::run_finalized(run_id))
            .await
            .unwrap_err();
        assert!(matches!(err, GroundworkError::RunClosed { .. }));

        tokio::fs::remove_file(&archived).await.unwrap();
    }
}
