//! Queue manager: the boundary between a failed report attempt and the store.

use crate::db::SubmissionStore;
use crate::models::{IssuePayload, QueuedSubmission, StoredSubmission, SubmissionId};
use crate::submit::{IssueSubmitter, SubmissionFailure};
use crate::{Error, Result};

/// What happened to an online-first report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    /// The server accepted the report directly
    Submitted,
    /// The server was unreachable; the report waits in the offline queue
    Queued(SubmissionId),
}

/// Offline queue of issue reports backed by a [`SubmissionStore`]
#[derive(Debug)]
pub struct OfflineQueue<S> {
    store: S,
}

impl<S: SubmissionStore> OfflineQueue<S> {
    /// Create a queue over the given store
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Persist a new report and return its freshly generated id.
    pub async fn enqueue(&self, payload: IssuePayload) -> Result<SubmissionId> {
        if payload.is_empty() {
            return Err(Error::InvalidInput(
                "Issue payload must contain at least one field".into(),
            ));
        }

        let mut submission = QueuedSubmission::new(payload);
        while self.store.get(&submission.id).await?.is_some() {
            submission.id = SubmissionId::generate(submission.enqueued_at);
        }

        self.store.put(&submission).await?;
        tracing::debug!(id = %submission.id, "Queued issue report for later submission");
        Ok(submission.id)
    }

    /// Remove a record, typically after the server confirmed it.
    pub async fn dequeue(&self, id: &SubmissionId) -> Result<()> {
        self.store.delete(id).await
    }

    /// Every decodable queued report, oldest first.
    ///
    /// Corrupt rows are skipped here; the next drain pass removes them.
    pub async fn list_pending(&self) -> Result<Vec<QueuedSubmission>> {
        let mut pending = Vec::new();
        for stored in self.store.list().await? {
            match stored {
                StoredSubmission::Ready(submission) => pending.push(submission),
                StoredSubmission::Corrupt { id, reason } => {
                    tracing::warn!(%id, "Skipping unreadable queued report: {reason}");
                }
            }
        }
        Ok(pending)
    }

    /// Every stored row, corrupt ones included.
    pub async fn snapshot(&self) -> Result<Vec<StoredSubmission>> {
        self.store.list().await
    }

    /// Persist a record after a failed attempt so its retry count survives.
    pub async fn reschedule(&self, submission: &QueuedSubmission) -> Result<()> {
        self.store.put(submission).await
    }

    /// Number of stored rows.
    ///
    /// Counts corrupt rows that [`Self::list_pending`] skips until the next
    /// drain pass purges them.
    pub async fn len(&self) -> Result<usize> {
        self.store.count().await
    }

    /// Whether nothing is queued.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Drop every queued report.
    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await
    }

    /// Try the endpoint first and fall back to the queue when it is unreachable.
    ///
    /// A non-2xx answer is returned as [`Error::Rejected`] and nothing is queued.
    pub async fn submit_or_enqueue<C: IssueSubmitter>(
        &self,
        submitter: &C,
        payload: IssuePayload,
    ) -> Result<ReportOutcome> {
        if payload.is_empty() {
            return Err(Error::InvalidInput(
                "Issue payload must contain at least one field".into(),
            ));
        }

        match submitter.submit(&payload).await {
            Ok(()) => Ok(ReportOutcome::Submitted),
            Err(SubmissionFailure::Rejected { status }) => Err(Error::Rejected { status }),
            Err(SubmissionFailure::Transport(reason)) => {
                tracing::info!("Issues endpoint unreachable ({reason}); queueing report");
                let id = self.enqueue(payload).await?;
                Ok(ReportOutcome::Queued(id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, LibSqlSubmissionStore, MemorySubmissionStore};
    use crate::models::RawSubmissionRow;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::collections::HashSet;
    use tempfile::tempdir;

    fn payload(value: Value) -> IssuePayload {
        match value {
            Value::Object(map) => map,
            _ => panic!("test payload must be an object"),
        }
    }

    struct FixedSubmitter(std::result::Result<(), SubmissionFailure>);

    impl IssueSubmitter for FixedSubmitter {
        async fn submit(
            &self,
            _payload: &IssuePayload,
        ) -> std::result::Result<(), SubmissionFailure> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn test_enqueue_ids_are_pairwise_distinct() {
        let queue = OfflineQueue::new(MemorySubmissionStore::new());

        let mut ids = HashSet::new();
        for n in 0..200 {
            let id = queue.enqueue(payload(json!({ "n": n }))).await.unwrap();
            assert!(ids.insert(id));
        }
        assert_eq!(queue.len().await.unwrap(), 200);
    }

    #[tokio::test]
    async fn test_enqueue_rejects_empty_payload() {
        let queue = OfflineQueue::new(MemorySubmissionStore::new());
        let error = queue.enqueue(IssuePayload::new()).await.unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));
        assert!(queue.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_dequeue_removes_record() {
        let queue = OfflineQueue::new(MemorySubmissionStore::new());
        let id = queue.enqueue(payload(json!({"a": 1}))).await.unwrap();
        queue.dequeue(&id).await.unwrap();
        assert!(queue.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_list_pending_skips_corrupt_rows() {
        let store = MemorySubmissionStore::new();
        store
            .insert_raw(RawSubmissionRow {
                id: "offline_0_corrupt".into(),
                payload: "{".into(),
                enqueued_at: 0,
                retry_count: 0,
            })
            .await;
        let queue = OfflineQueue::new(store);
        let id = queue.enqueue(payload(json!({"a": 1}))).await.unwrap();

        let pending = queue.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);
        assert_eq!(queue.snapshot().await.unwrap().len(), 2);
        assert_eq!(queue.len().await.unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_enqueued_payload_survives_restart() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("queue.db");
        let report = payload(json!({
            "fleetNumber": "T-107",
            "description": "engine overheating"
        }));

        let id = {
            let db = Database::open(&db_path).await.unwrap();
            let queue = OfflineQueue::new(LibSqlSubmissionStore::new(db.connection()));
            queue.enqueue(report.clone()).await.unwrap()
        };

        let db = Database::open(&db_path).await.unwrap();
        let queue = OfflineQueue::new(LibSqlSubmissionStore::new(db.connection()));
        let pending = queue.list_pending().await.unwrap();

        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);
        assert_eq!(pending[0].payload, report);
        assert_eq!(pending[0].retry_count, 0);
    }

    #[tokio::test]
    async fn test_submit_or_enqueue_submits_when_online() {
        let queue = OfflineQueue::new(MemorySubmissionStore::new());
        let outcome = queue
            .submit_or_enqueue(&FixedSubmitter(Ok(())), payload(json!({"a": 1})))
            .await
            .unwrap();

        assert_eq!(outcome, ReportOutcome::Submitted);
        assert!(queue.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_submit_or_enqueue_queues_on_transport_failure() {
        let queue = OfflineQueue::new(MemorySubmissionStore::new());
        let offline = FixedSubmitter(Err(SubmissionFailure::Transport("dns".into())));

        let outcome = queue
            .submit_or_enqueue(&offline, payload(json!({"a": 1})))
            .await
            .unwrap();

        let ReportOutcome::Queued(id) = outcome else {
            panic!("expected report to be queued");
        };
        let pending = queue.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);
    }

    /// Store whose every operation fails, like a full or unmounted disk.
    struct UnavailableStore;

    fn unavailable() -> Error {
        Error::Storage("device storage unavailable".into())
    }

    impl SubmissionStore for UnavailableStore {
        async fn put(&self, _submission: &QueuedSubmission) -> Result<()> {
            Err(unavailable())
        }

        async fn get(&self, _id: &SubmissionId) -> Result<Option<StoredSubmission>> {
            Err(unavailable())
        }

        async fn list(&self) -> Result<Vec<StoredSubmission>> {
            Err(unavailable())
        }

        async fn delete(&self, _id: &SubmissionId) -> Result<()> {
            Err(unavailable())
        }

        async fn clear(&self) -> Result<()> {
            Err(unavailable())
        }

        async fn count(&self) -> Result<usize> {
            Err(unavailable())
        }
    }

    #[tokio::test]
    async fn test_store_failures_propagate_to_caller() {
        let queue = OfflineQueue::new(UnavailableStore);

        let error = queue.enqueue(payload(json!({"a": 1}))).await.unwrap_err();
        assert!(error.is_storage());

        let id: SubmissionId = "offline_1_abc".parse().unwrap();
        assert!(queue.dequeue(&id).await.unwrap_err().is_storage());
        assert!(queue.list_pending().await.unwrap_err().is_storage());
        assert!(queue.len().await.unwrap_err().is_storage());
    }

    #[tokio::test]
    async fn test_offline_submit_with_broken_store_reports_storage_error() {
        let queue = OfflineQueue::new(UnavailableStore);
        let offline = FixedSubmitter(Err(SubmissionFailure::Transport("no route".into())));

        let error = queue
            .submit_or_enqueue(&offline, payload(json!({"a": 1})))
            .await
            .unwrap_err();
        assert!(error.is_storage());
    }

    #[tokio::test]
    async fn test_len_counts_corrupt_rows_that_list_pending_skips() {
        let store = MemorySubmissionStore::new();
        store
            .insert_raw(RawSubmissionRow {
                id: "offline_0_corrupt".into(),
                payload: "[1, 2]".into(),
                enqueued_at: 0,
                retry_count: 0,
            })
            .await;
        let queue = OfflineQueue::new(store);
        queue.enqueue(payload(json!({"a": 1}))).await.unwrap();

        assert_eq!(queue.len().await.unwrap(), 2);
        assert_eq!(queue.list_pending().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_or_enqueue_surfaces_rejection() {
        let queue = OfflineQueue::new(MemorySubmissionStore::new());
        let rejecting = FixedSubmitter(Err(SubmissionFailure::Rejected { status: 422 }));

        let error = queue
            .submit_or_enqueue(&rejecting, payload(json!({"a": 1})))
            .await
            .unwrap_err();

        assert!(matches!(error, Error::Rejected { status: 422 }));
        assert!(queue.is_empty().await.unwrap());
    }
}
