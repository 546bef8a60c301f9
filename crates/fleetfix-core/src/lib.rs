//! fleetfix-core - Core library for Fleetfix
//!
//! This crate contains the offline issue queue used by every Fleetfix client:
//! the durable local store, the queue manager, the retrying sync engine, and
//! the connectivity trigger that decides when a drain pass runs.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod queue;
pub mod submit;
pub mod sync;
pub mod trigger;
pub mod util;

pub use error::{Error, Result};
pub use models::{IssuePayload, QueuedSubmission, StoredSubmission, SubmissionId, SyncResult};
pub use queue::{OfflineQueue, ReportOutcome};
pub use submit::{HttpIssueSubmitter, IssueSubmitter, SubmissionFailure};
pub use sync::{SyncEngine, SyncPolicy};
pub use config::{ClientConfig, ConfigError};
pub use trigger::{trigger_channel, ConnectivityTrigger, TriggerListener, WorkerEvent};
