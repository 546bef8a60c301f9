use std::path::Path;

use crate::commands::common::{open_database, queue_for};
use crate::error::CliError;

pub async fn run_count(db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    println!("{}", queue_for(&db).len().await?);
    Ok(())
}
