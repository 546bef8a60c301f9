use std::path::Path;

use fleetfix_core::{ClientConfig, ReportOutcome};

use crate::commands::common::{build_report_payload, open_database, queue_for};
use crate::error::CliError;

pub struct ReportArgs<'a> {
    pub fleet_number: Option<&'a str>,
    pub description: Option<&'a str>,
    pub fields: &'a [String],
    pub json: Option<&'a str>,
    pub queue_only: bool,
}

pub async fn run_report(
    args: ReportArgs<'_>,
    config: &ClientConfig,
    db_path: &Path,
) -> Result<(), CliError> {
    let payload =
        build_report_payload(args.fleet_number, args.description, args.fields, args.json)?;
    let db = open_database(db_path).await?;
    let queue = queue_for(&db);

    if args.queue_only || config.issues_endpoint.is_none() {
        if !args.queue_only {
            tracing::warn!("FLEETFIX_ISSUES_ENDPOINT is not set; queueing report");
        }
        let id = queue.enqueue(payload).await?;
        println!("Queued {id} ({} pending)", queue.len().await?);
        return Ok(());
    }

    let submitter = config.submitter()?;
    match queue.submit_or_enqueue(&submitter, payload).await? {
        ReportOutcome::Submitted => println!("Issue reported"),
        ReportOutcome::Queued(id) => println!(
            "Backend unreachable; queued {id} for later delivery ({} pending)",
            queue.len().await?
        ),
    }
    Ok(())
}
