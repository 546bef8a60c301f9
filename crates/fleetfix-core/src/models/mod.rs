//! Data models for Fleetfix

mod submission;
mod sync_result;

pub use submission::{
    IssuePayload, QueuedSubmission, RawSubmissionRow, StoredSubmission, SubmissionId,
};
pub use sync_result::SyncResult;
