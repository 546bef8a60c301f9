use std::path::Path;

use crate::commands::common::{open_database, queue_for};
use crate::error::CliError;

pub async fn run_clear(confirmed: bool, db_path: &Path) -> Result<(), CliError> {
    if !confirmed {
        return Err(CliError::ConfirmationRequired);
    }

    let db = open_database(db_path).await?;
    let queue = queue_for(&db);
    let discarded = queue.len().await?;
    queue.clear().await?;

    tracing::info!(discarded, "Cleared offline queue");
    println!("Discarded {discarded} queued report(s)");
    Ok(())
}
