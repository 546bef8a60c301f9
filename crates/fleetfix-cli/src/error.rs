use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] fleetfix_core::Error),
    #[error(transparent)]
    Config(#[from] fleetfix_core::ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No report fields provided; pass --fleet-number/--description, --field or --json")]
    EmptyReport,
    #[error("Invalid --field value `{0}`; expected KEY=VALUE")]
    InvalidField(String),
    #[error("Report JSON must be an object: {0}")]
    InvalidReportJson(String),
    #[error("Refusing to discard queued reports without --yes")]
    ConfirmationRequired,
}
