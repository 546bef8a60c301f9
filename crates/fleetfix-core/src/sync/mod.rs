//! Retry/sync engine: drains the offline queue against the issues endpoint.
//!
//! Each queued record gets at most one submission attempt per drain pass.
//! Failed records are re-persisted with an incremented retry count and wait
//! for the next trigger; once the count exceeds the policy ceiling the record
//! is abandoned. Transport errors and non-2xx answers count the same.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::db::{LastSyncStore, SubmissionStore};
use crate::models::{IssuePayload, QueuedSubmission, StoredSubmission, SubmissionId, SyncResult};
use crate::queue::OfflineQueue;
use crate::submit::IssueSubmitter;
use crate::util::unix_timestamp_now_ms;
use crate::Result;

/// Default retry ceiling: a record is abandoned on its sixth failed attempt.
pub const MAX_RETRIES: u32 = 5;

/// Retry policy applied by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    /// Failed attempts tolerated before a record is abandoned
    pub max_retries: u32,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
        }
    }
}

impl SyncPolicy {
    /// Create a policy with a custom ceiling
    pub const fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Whether a record with this many failed attempts must be abandoned.
    pub const fn is_exhausted(&self, retry_count: u32) -> bool {
        retry_count > self.max_retries
    }
}

/// Clears the draining flag however the pass ends.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drains an [`OfflineQueue`] through an [`IssueSubmitter`].
pub struct SyncEngine<S, L, C> {
    queue: OfflineQueue<S>,
    last_sync: L,
    submitter: C,
    policy: SyncPolicy,
    draining: AtomicBool,
    rerun_requested: AtomicBool,
}

impl<S, L, C> SyncEngine<S, L, C>
where
    S: SubmissionStore,
    L: LastSyncStore,
    C: IssueSubmitter,
{
    /// Create an engine with the default retry policy
    pub fn new(queue: OfflineQueue<S>, last_sync: L, submitter: C) -> Self {
        Self {
            queue,
            last_sync,
            submitter,
            policy: SyncPolicy::default(),
            draining: AtomicBool::new(false),
            rerun_requested: AtomicBool::new(false),
        }
    }

    /// Replace the retry policy
    #[must_use]
    pub const fn with_policy(mut self, policy: SyncPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Whether a drain pass is currently in flight
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Queue a report for the next drain pass.
    pub async fn enqueue(&self, payload: IssuePayload) -> Result<SubmissionId> {
        self.queue.enqueue(payload).await
    }

    /// Decodable queued reports, oldest first.
    pub async fn list_pending(&self) -> Result<Vec<QueuedSubmission>> {
        self.queue.list_pending().await
    }

    /// Number of queued rows.
    pub async fn queue_length(&self) -> Result<usize> {
        self.queue.len().await
    }

    /// Timestamp (Unix ms) of the last completed drain pass.
    pub async fn last_sync_time(&self) -> Result<Option<i64>> {
        self.last_sync.last_sync_time().await
    }

    /// Run one drain pass over the current queue.
    ///
    /// Returns `Ok(None)` when a pass is already running. The request is then
    /// handed to the running pass, which performs one more pass once it
    /// finishes and folds the counters into its own result. A request that
    /// lands while the running pass is releasing the flag is picked up by
    /// whichever side notices it first. Store failures abort the pass;
    /// submission failures never do.
    pub async fn run_drain_pass(&self) -> Result<Option<SyncResult>> {
        let mut total: Option<SyncResult> = None;

        loop {
            if self
                .draining
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                self.rerun_requested.store(true, Ordering::SeqCst);
                if self.draining.load(Ordering::SeqCst) {
                    tracing::debug!("Drain pass already running; coalescing trigger");
                    return Ok(total);
                }
                continue;
            }

            let pass = {
                let _guard = DrainGuard(&self.draining);
                self.rerun_requested.store(false, Ordering::SeqCst);

                let mut pass = self.drain_once().await?;
                while self.rerun_requested.swap(false, Ordering::SeqCst) {
                    tracing::debug!("Running coalesced drain pass");
                    pass += self.drain_once().await?;
                }
                pass
            };
            *total.get_or_insert_with(SyncResult::default) += pass;

            // Requested after the last swap but before the flag was released.
            if !self.rerun_requested.load(Ordering::SeqCst) {
                return Ok(total);
            }
        }
    }

    async fn drain_once(&self) -> Result<SyncResult> {
        let snapshot = self.queue.snapshot().await?;
        let mut result = SyncResult::default();

        if !snapshot.is_empty() {
            tracing::info!(pending = snapshot.len(), "Starting drain pass");
        }

        for stored in snapshot {
            match stored {
                StoredSubmission::Ready(submission) => {
                    self.process(submission, &mut result).await?;
                }
                StoredSubmission::Corrupt { id, reason } => {
                    tracing::warn!(%id, "Dropping unreadable queued report: {reason}");
                    self.queue.dequeue(&id).await?;
                    result.permanently_failed += 1;
                }
            }
        }

        self.last_sync
            .set_last_sync_time(unix_timestamp_now_ms())
            .await?;

        tracing::info!(
            succeeded = result.succeeded,
            permanently_failed = result.permanently_failed,
            retried = result.retried,
            "Drain pass finished"
        );
        Ok(result)
    }

    async fn process(
        &self,
        mut submission: QueuedSubmission,
        result: &mut SyncResult,
    ) -> Result<()> {
        match self.submitter.submit(&submission.payload).await {
            Ok(()) => {
                self.queue.dequeue(&submission.id).await?;
                result.succeeded += 1;
                tracing::debug!(id = %submission.id, "Queued report submitted");
            }
            Err(failure) => {
                let attempts = submission.record_failure();
                if self.policy.is_exhausted(attempts) {
                    tracing::warn!(
                        id = %submission.id,
                        attempts,
                        "Abandoning queued report after exceeding retry ceiling: {failure}"
                    );
                    self.queue.dequeue(&submission.id).await?;
                    result.permanently_failed += 1;
                } else {
                    tracing::debug!(
                        id = %submission.id,
                        attempts,
                        "Queued report submission failed: {failure}"
                    );
                    self.queue.reschedule(&submission).await?;
                    result.retried += 1;
                }
            }
        }
        Ok(())
    }
}
