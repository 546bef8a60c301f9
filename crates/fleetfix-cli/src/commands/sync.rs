use std::path::Path;

use fleetfix_core::ClientConfig;

use crate::commands::common::{engine_for, format_sync_result, open_database};
use crate::error::CliError;

pub async fn run_sync(config: &ClientConfig, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let engine = engine_for(&db, config)?;

    match engine.run_drain_pass().await? {
        Some(result) => println!("{}", format_sync_result(&result)),
        None => println!("A sync pass is already running"),
    }

    let remaining = engine.queue_length().await?;
    if remaining > 0 {
        println!("{remaining} report(s) still queued");
    }
    Ok(())
}
