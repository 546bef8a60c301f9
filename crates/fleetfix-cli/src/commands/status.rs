use std::path::Path;

use fleetfix_core::db::{LastSyncStore, LibSqlLastSyncStore};
use fleetfix_core::util::unix_timestamp_now_ms;
use fleetfix_core::ClientConfig;

use crate::commands::common::{format_last_sync, open_database, queue_for, StatusItem};
use crate::error::CliError;

pub async fn run_status(
    as_json: bool,
    config: &ClientConfig,
    db_path: &Path,
) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let status = StatusItem {
        pending: queue_for(&db).len().await?,
        last_sync_time: LibSqlLastSyncStore::new(db.connection())
            .last_sync_time()
            .await?,
        issues_endpoint: config.issues_endpoint.clone(),
        max_retries: config.max_retries,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Queued reports: {}", status.pending);
    println!(
        "Last sync:      {}",
        format_last_sync(status.last_sync_time, unix_timestamp_now_ms())
    );
    println!(
        "Endpoint:       {}",
        status.issues_endpoint.as_deref().unwrap_or("(not configured)")
    );
    println!("Database:       {}", db_path.display());
    Ok(())
}
