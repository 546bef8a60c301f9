//! Durable local store for the offline queue

mod connection;
mod last_sync_repository;
mod memory;
mod migrations;
mod submission_store;

pub use connection::Database;
pub use last_sync_repository::{LastSyncStore, LibSqlLastSyncStore};
pub use memory::{MemoryLastSyncStore, MemorySubmissionStore};
pub use submission_store::{LibSqlSubmissionStore, SubmissionStore};
