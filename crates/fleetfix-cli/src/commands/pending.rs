use std::path::Path;

use fleetfix_core::util::unix_timestamp_now_ms;

use crate::commands::common::{
    format_pending_lines, open_database, pending_to_item, queue_for, PendingItem,
};
use crate::error::CliError;

pub async fn run_pending(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let queue = queue_for(&db);
    let pending = queue.list_pending().await?;
    let unreadable = queue.len().await?.saturating_sub(pending.len());

    if as_json {
        let json_items = pending
            .iter()
            .map(pending_to_item)
            .collect::<Vec<PendingItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if pending.is_empty() && unreadable == 0 {
        println!("No queued reports.");
        return Ok(());
    }

    for line in format_pending_lines(&pending, unix_timestamp_now_ms()) {
        println!("{line}");
    }
    if unreadable > 0 {
        println!("{unreadable} unreadable report(s) will be discarded on the next sync");
    }
    Ok(())
}
