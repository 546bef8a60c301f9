//! In-memory store backends
//!
//! Each instance is independent, so every test can start from an empty queue.
//! Rows are kept in their encoded form to mirror what the libSQL backend sees.

use tokio::sync::Mutex;

use super::{LastSyncStore, SubmissionStore};
use crate::error::Result;
use crate::models::{QueuedSubmission, RawSubmissionRow, StoredSubmission, SubmissionId};

/// In-memory implementation of `SubmissionStore`, insertion ordered
#[derive(Debug, Default)]
pub struct MemorySubmissionStore {
    rows: Mutex<Vec<RawSubmissionRow>>,
}

impl MemorySubmissionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an already-encoded row as-is, without validating it.
    pub async fn insert_raw(&self, row: RawSubmissionRow) {
        let mut rows = self.rows.lock().await;
        upsert(&mut rows, row);
    }
}

fn upsert(rows: &mut Vec<RawSubmissionRow>, row: RawSubmissionRow) {
    if let Some(existing) = rows.iter_mut().find(|existing| existing.id == row.id) {
        *existing = row;
    } else {
        rows.push(row);
    }
}

impl SubmissionStore for MemorySubmissionStore {
    async fn put(&self, submission: &QueuedSubmission) -> Result<()> {
        let row = RawSubmissionRow::encode(submission)?;
        let mut rows = self.rows.lock().await;
        upsert(&mut rows, row);
        Ok(())
    }

    async fn get(&self, id: &SubmissionId) -> Result<Option<StoredSubmission>> {
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .find(|row| row.id == id.as_str())
            .cloned()
            .map(RawSubmissionRow::decode))
    }

    async fn list(&self) -> Result<Vec<StoredSubmission>> {
        let rows = self.rows.lock().await;
        Ok(rows.iter().cloned().map(RawSubmissionRow::decode).collect())
    }

    async fn delete(&self, id: &SubmissionId) -> Result<()> {
        self.rows.lock().await.retain(|row| row.id != id.as_str());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.rows.lock().await.clear();
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.rows.lock().await.len())
    }
}

/// In-memory implementation of `LastSyncStore`
#[derive(Debug, Default)]
pub struct MemoryLastSyncStore {
    value: Mutex<Option<i64>>,
}

impl MemoryLastSyncStore {
    /// Create a store that has never synced
    pub fn new() -> Self {
        Self::default()
    }
}

impl LastSyncStore for MemoryLastSyncStore {
    async fn last_sync_time(&self) -> Result<Option<i64>> {
        Ok(*self.value.lock().await)
    }

    async fn set_last_sync_time(&self, timestamp_ms: i64) -> Result<()> {
        *self.value.lock().await = Some(timestamp_ms);
        Ok(())
    }
}
