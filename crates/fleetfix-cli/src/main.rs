//! Fleetfix CLI - report vehicle issues from the depot
//!
//! Reports go straight to the backend when it answers and wait in a local
//! queue when it doesn't.

mod cli;
mod commands;
mod error;


use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::clear::run_clear;
use crate::commands::common::{load_config, resolve_db_path};
use crate::commands::completions::run_completions;
use crate::commands::count::run_count;
use crate::commands::pending::run_pending;
use crate::commands::report::{run_report, ReportArgs};
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::commands::watch::run_watch;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "fleetfix=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Commands::Report {
            fleet_number,
            description,
            fields,
            json,
            queue_only,
        } => {
            let args = ReportArgs {
                fleet_number: fleet_number.as_deref(),
                description: description.as_deref(),
                fields: &fields,
                json: json.as_deref(),
                queue_only,
            };
            run_report(args, &load_config()?, &db_path).await?;
        }
        Commands::Pending { json } => run_pending(json, &db_path).await?,
        Commands::Count => run_count(&db_path).await?,
        Commands::Sync => run_sync(&load_config()?, &db_path).await?,
        Commands::Status { json } => run_status(json, &load_config()?, &db_path).await?,
        Commands::Watch { stdin } => run_watch(stdin, &load_config()?, &db_path).await?,
        Commands::Clear { yes } => run_clear(yes, &db_path).await?,
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
    }

    Ok(())
}
