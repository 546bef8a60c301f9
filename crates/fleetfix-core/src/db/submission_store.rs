//! Submission store implementation

use crate::error::Result;
use crate::models::{QueuedSubmission, RawSubmissionRow, StoredSubmission, SubmissionId};
use libsql::{Connection, Value};

/// Trait for durable queue storage operations (async)
///
/// Records are keyed by [`SubmissionId`]; `put` is an upsert. Callers must not
/// run overlapping operations on the same id; the sync engine serializes that.
#[allow(async_fn_in_trait)]
pub trait SubmissionStore {
    /// Insert or overwrite a record
    async fn put(&self, submission: &QueuedSubmission) -> Result<()>;

    /// Get a record by ID
    async fn get(&self, id: &SubmissionId) -> Result<Option<StoredSubmission>>;

    /// List every stored record, oldest first
    async fn list(&self) -> Result<Vec<StoredSubmission>>;

    /// Remove a record; no-op when absent
    async fn delete(&self, id: &SubmissionId) -> Result<()>;

    /// Remove every record
    async fn clear(&self) -> Result<()>;

    /// Number of stored records
    async fn count(&self) -> Result<usize>;
}

/// libSQL implementation of `SubmissionStore`
pub struct LibSqlSubmissionStore<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSubmissionStore<'a> {
    /// Create a new store with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a database row. Columns holding the wrong SQLite type yield a
    /// [`StoredSubmission::Corrupt`] rather than an error.
    fn parse_row(row: &libsql::Row) -> Result<StoredSubmission> {
        let id = match row.get_value(0)? {
            Value::Text(id) => id,
            Value::Integer(id) => id.to_string(),
            Value::Real(id) => id.to_string(),
            other => {
                return Ok(StoredSubmission::Corrupt {
                    id: SubmissionId::from(String::new()),
                    reason: format!("id column holds {}", value_kind(&other)),
                })
            }
        };

        let raw = match (row.get_value(1)?, row.get_value(2)?, row.get_value(3)?) {
            (Value::Text(payload), Value::Integer(enqueued_at), Value::Integer(retry_count)) => {
                RawSubmissionRow {
                    id,
                    payload,
                    enqueued_at,
                    retry_count,
                }
            }
            (payload, enqueued_at, retry_count) => {
                return Ok(StoredSubmission::Corrupt {
                    id: SubmissionId::from(id),
                    reason: format!(
                        "unexpected column types: payload {}, enqueued_at {}, retry_count {}",
                        value_kind(&payload),
                        value_kind(&enqueued_at),
                        value_kind(&retry_count)
                    ),
                })
            }
        };

        Ok(raw.decode())
    }
}

const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Integer(_) => "integer",
        Value::Real(_) => "real",
        Value::Text(_) => "text",
        Value::Blob(_) => "blob",
    }
}

impl SubmissionStore for LibSqlSubmissionStore<'_> {
    async fn put(&self, submission: &QueuedSubmission) -> Result<()> {
        let row = RawSubmissionRow::encode(submission)?;

        self.conn
            .execute(
                "INSERT OR REPLACE INTO offline_submissions (id, payload, enqueued_at, retry_count)
                 VALUES (?, ?, ?, ?)",
                libsql::params![row.id, row.payload, row.enqueued_at, row.retry_count],
            )
            .await?;

        Ok(())
    }

    async fn get(&self, id: &SubmissionId) -> Result<Option<StoredSubmission>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, payload, enqueued_at, retry_count
                 FROM offline_submissions
                 WHERE id = ?",
                libsql::params![id.as_str()],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::parse_row(&row)?))
        } else {
            Ok(None)
        }
    }

    async fn list(&self) -> Result<Vec<StoredSubmission>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, payload, enqueued_at, retry_count
                 FROM offline_submissions
                 ORDER BY enqueued_at ASC, id ASC",
                (),
            )
            .await?;

        let mut submissions = Vec::new();
        while let Some(row) = rows.next().await? {
            submissions.push(Self::parse_row(&row)?);
        }

        Ok(submissions)
    }

    async fn delete(&self, id: &SubmissionId) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM offline_submissions WHERE id = ?",
                libsql::params![id.as_str()],
            )
            .await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.conn
            .execute("DELETE FROM offline_submissions", ())
            .await?;
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM offline_submissions", ())
            .await?;

        let count: i64 = if let Some(row) = rows.next().await? {
            row.get(0)?
        } else {
            0
        };

        Ok(usize::try_from(count).unwrap_or_default())
    }
}
