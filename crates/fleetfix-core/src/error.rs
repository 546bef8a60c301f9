//! Error types for fleetfix-core

use thiserror::Error;

/// Result type alias using fleetfix-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in fleetfix-core operations
///
/// Submission failures during a drain pass are not represented here: the
/// sync engine absorbs them into retry counts (see [`crate::SubmissionFailure`]).
#[derive(Error, Debug)]
pub enum Error {
    /// Device storage unavailable or a write failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The issues endpoint answered an online report with a non-2xx status
    #[error("Issue report rejected by server (HTTP {status})")]
    Rejected { status: u16 },

    /// Client configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the error originates in the durable local store.
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::LibSql(_) | Self::Io(_))
    }
}
