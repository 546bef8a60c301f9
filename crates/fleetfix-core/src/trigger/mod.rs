//! Connectivity trigger: decides when a drain pass runs.
//!
//! Background sources (a periodic wake, a reconnect watcher, or a raw message
//! relayed from a platform worker) push [`WorkerEvent`]s into a bounded
//! channel. A single [`TriggerListener`] consumes them: `sync-issues` runs a
//! drain pass, `update-available` is handed to an [`UpdateNotifier`].

mod reconnect;

pub use reconnect::{
    spawn_periodic_sync, spawn_reconnect_watch, HttpReachabilityProbe, ReachabilityProbe,
    ReconnectDetector,
};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::db::{LastSyncStore, SubmissionStore};
use crate::submit::IssueSubmitter;
use crate::sync::SyncEngine;
use crate::Result;

/// Default number of undelivered events the channel holds.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Tagged message relayed from the background worker to the active client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WorkerEvent {
    /// Connectivity (probably) returned; drain the queue
    SyncIssues,
    /// A newer client build is available
    UpdateAvailable {
        #[serde(default)]
        version: Option<String>,
    },
}

impl WorkerEvent {
    /// Parse a raw worker message such as `{"type":"sync-issues"}`.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Wire tag of this event kind
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::SyncIssues => "sync-issues",
            Self::UpdateAvailable { .. } => "update-available",
        }
    }
}

/// Receives "new version available" notices (e.g. to prompt for a restart).
pub trait UpdateNotifier {
    fn update_available(&mut self, version: Option<&str>);
}

impl<F> UpdateNotifier for F
where
    F: FnMut(Option<&str>),
{
    fn update_available(&mut self, version: Option<&str>) {
        self(version);
    }
}

/// Create a connected trigger/listener pair.
pub fn trigger_channel(capacity: usize) -> (ConnectivityTrigger, TriggerListener) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ConnectivityTrigger { tx }, TriggerListener { rx })
}

/// Sending half; cheap to clone and hand to every event source.
#[derive(Debug, Clone)]
pub struct ConnectivityTrigger {
    tx: mpsc::Sender<WorkerEvent>,
}

impl ConnectivityTrigger {
    /// Ask for a drain pass. Returns whether the event was accepted.
    pub fn request_sync(&self) -> bool {
        self.deliver(WorkerEvent::SyncIssues)
    }

    /// Relay a "new version available" notice.
    pub fn announce_update(&self, version: Option<String>) -> bool {
        self.deliver(WorkerEvent::UpdateAvailable { version })
    }

    /// Deliver an event without waiting.
    ///
    /// Delivery is at-most-once: a full channel or a gone listener drops the
    /// event. A dropped `sync-issues` is harmless since one is already pending.
    pub fn deliver(&self, event: WorkerEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                tracing::debug!(event = event.tag(), "Trigger channel full; dropping event");
                false
            }
            Err(TrySendError::Closed(event)) => {
                tracing::debug!(event = event.tag(), "Trigger listener gone; dropping event");
                false
            }
        }
    }

    /// Parse and deliver a raw worker message.
    pub fn deliver_raw(&self, raw: &str) -> Result<bool> {
        Ok(self.deliver(WorkerEvent::from_json(raw)?))
    }

    /// Whether the listener has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// What a listener did before its channel closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    pub sync_requests: usize,
    pub drain_passes: usize,
    pub failed_passes: usize,
    pub updates: usize,
}

/// Receiving half. Not clonable: exactly one handler per client instance.
#[derive(Debug)]
pub struct TriggerListener {
    rx: mpsc::Receiver<WorkerEvent>,
}

impl TriggerListener {
    /// Wait for the next event; `None` once every trigger is dropped.
    pub async fn next_event(&mut self) -> Option<WorkerEvent> {
        self.rx.recv().await
    }

    /// Dispatch events until every [`ConnectivityTrigger`] is dropped.
    ///
    /// Sync requests already buffered when one is picked up are folded into
    /// the same drain pass. A failed pass is logged and the listener keeps
    /// going; the next trigger retries.
    pub async fn run<S, L, C, N>(
        mut self,
        engine: &SyncEngine<S, L, C>,
        notifier: &mut N,
    ) -> ListenerStats
    where
        S: SubmissionStore,
        L: LastSyncStore,
        C: IssueSubmitter,
        N: UpdateNotifier + ?Sized,
    {
        let mut stats = ListenerStats::default();

        while let Some(event) = self.rx.recv().await {
            match event {
                WorkerEvent::UpdateAvailable { version } => {
                    stats.updates += 1;
                    notifier.update_available(version.as_deref());
                }
                WorkerEvent::SyncIssues => {
                    stats.sync_requests += 1;
                    while let Ok(buffered) = self.rx.try_recv() {
                        match buffered {
                            WorkerEvent::SyncIssues => stats.sync_requests += 1,
                            WorkerEvent::UpdateAvailable { version } => {
                                stats.updates += 1;
                                notifier.update_available(version.as_deref());
                            }
                        }
                    }

                    match engine.run_drain_pass().await {
                        Ok(Some(result)) => {
                            stats.drain_passes += 1;
                            if result.permanently_failed > 0 {
                                tracing::warn!(
                                    abandoned = result.permanently_failed,
                                    "Some queued issue reports were abandoned"
                                );
                            }
                        }
                        Ok(None) => {}
                        Err(error) => {
                            stats.failed_passes += 1;
                            tracing::error!("Drain pass failed: {error}");
                        }
                    }
                }
            }
        }

        tracing::debug!(?stats, "Trigger listener stopped");
        stats
    }
}
