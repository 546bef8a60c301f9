use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "fleetfix")]
#[command(about = "Report vehicle issues from the depot, online or not")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local queue database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Report a vehicle issue; queued for later when the backend is unreachable
    #[command(alias = "new")]
    Report {
        /// Fleet number of the affected vehicle
        #[arg(long, value_name = "NUMBER")]
        fleet_number: Option<String>,
        /// What is wrong with the vehicle
        #[arg(long, value_name = "TEXT")]
        description: Option<String>,
        /// Extra report field; values that parse as JSON are stored as JSON
        #[arg(long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
        /// Full report as a JSON object; flags above override its fields
        #[arg(long, value_name = "JSON")]
        json: Option<String>,
        /// Skip the online attempt and queue directly
        #[arg(long)]
        queue_only: bool,
    },
    /// List queued reports waiting for delivery
    Pending {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the number of queued reports
    Count,
    /// Deliver queued reports now
    Sync,
    /// Show queue length and last successful sync
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Keep draining the queue whenever connectivity returns (Ctrl-C to stop)
    Watch {
        /// Relay newline-delimited worker messages from stdin
        #[arg(long)]
        stdin: bool,
    },
    /// Drop every queued report without delivering it
    Clear {
        /// Confirm the reports should be discarded
        #[arg(long)]
        yes: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
