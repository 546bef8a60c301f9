//! Last-sync bookkeeping repository

use crate::error::Result;
use libsql::Connection;

const LAST_SYNC_KEY: &str = "last_sync_time";

/// Trait for the persisted "last successful drain" scalar (async)
#[allow(async_fn_in_trait)]
pub trait LastSyncStore {
    /// Timestamp (Unix ms) of the last completed drain pass, if any
    async fn last_sync_time(&self) -> Result<Option<i64>>;

    /// Overwrite the last sync timestamp
    async fn set_last_sync_time(&self, timestamp_ms: i64) -> Result<()>;
}

/// libSQL implementation of `LastSyncStore`
pub struct LibSqlLastSyncStore<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlLastSyncStore<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM sync_state WHERE key = ?", [key])
            .await?;

        if let Some(row) = rows.next().await? {
            let value: String = row.get(0)?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    async fn set_value(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO sync_state (key, value) VALUES (?, ?)",
                [key, value],
            )
            .await?;
        Ok(())
    }
}

impl LastSyncStore for LibSqlLastSyncStore<'_> {
    async fn last_sync_time(&self) -> Result<Option<i64>> {
        let Some(value) = self.get_value(LAST_SYNC_KEY).await? else {
            return Ok(None);
        };

        match value.trim().parse::<i64>() {
            Ok(timestamp) => Ok(Some(timestamp)),
            Err(error) => {
                tracing::warn!("Ignoring unreadable last sync time {value:?}: {error}");
                Ok(None)
            }
        }
    }

    async fn set_last_sync_time(&self, timestamp_ms: i64) -> Result<()> {
        self.set_value(LAST_SYNC_KEY, &timestamp_ms.to_string())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_last_sync_time_defaults_to_none() {
        let db = setup().await;
        let repo = LibSqlLastSyncStore::new(db.connection());

        assert_eq!(repo.last_sync_time().await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_set_and_overwrite_last_sync_time() {
        let db = setup().await;
        let repo = LibSqlLastSyncStore::new(db.connection());

        repo.set_last_sync_time(1_000).await.unwrap();
        assert_eq!(repo.last_sync_time().await.unwrap(), Some(1_000));

        repo.set_last_sync_time(2_000).await.unwrap();
        assert_eq!(repo.last_sync_time().await.unwrap(), Some(2_000));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unreadable_value_is_treated_as_never_synced() {
        let db = setup().await;
        let repo = LibSqlLastSyncStore::new(db.connection());

        repo.set_value(LAST_SYNC_KEY, "yesterday").await.unwrap();
        assert_eq!(repo.last_sync_time().await.unwrap(), None);
    }
}
