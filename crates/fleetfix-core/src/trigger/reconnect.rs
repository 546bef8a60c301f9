//! Background trigger sources: a periodic wake and a reconnect watcher.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::ConnectivityTrigger;
use crate::{Error, Result};

const MIN_INTERVAL: Duration = Duration::from_millis(10);
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Answers "can the backend be reached right now?".
pub trait ReachabilityProbe: Send + Sync + 'static {
    fn is_reachable(&self) -> impl Future<Output = bool> + Send;
}

/// Probe that treats any HTTP response, error statuses included, as reachable.
#[derive(Debug, Clone)]
pub struct HttpReachabilityProbe {
    url: String,
    client: reqwest::Client,
}

impl HttpReachabilityProbe {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if !crate::util::is_http_url(&url) {
            return Err(Error::Config(format!(
                "reachability probe URL must start with http:// or https://: {url}"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_PROBE_TIMEOUT)
            .build()
            .map_err(|error| Error::Config(format!("failed to build HTTP client: {error}")))?;

        Ok(Self { url, client })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ReachabilityProbe for HttpReachabilityProbe {
    fn is_reachable(&self) -> impl Future<Output = bool> + Send {
        let request = self.client.head(self.url.clone());
        async move { request.send().await.is_ok() }
    }
}

/// Tracks reachability samples and reports offline-to-online transitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconnectDetector {
    last: Option<bool>,
}

impl ReconnectDetector {
    /// Record a sample; `true` when it marks a return to connectivity.
    ///
    /// The first sample never counts as a reconnect.
    pub fn observe(&mut self, reachable: bool) -> bool {
        let regained = reachable && self.last == Some(false);
        self.last = Some(reachable);
        regained
    }

    pub const fn last(&self) -> Option<bool> {
        self.last
    }
}

/// Request a sync on every tick, starting immediately. Stops once the
/// listener is gone.
pub fn spawn_periodic_sync(trigger: ConnectivityTrigger, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(MIN_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if trigger.is_closed() {
                break;
            }
            trigger.request_sync();
        }
    })
}

/// Sample `probe` every `interval` and request a sync whenever the backend
/// becomes reachable again. Stops once the listener is gone.
pub fn spawn_reconnect_watch<P>(
    trigger: ConnectivityTrigger,
    probe: P,
    interval: Duration,
) -> JoinHandle<()>
where
    P: ReachabilityProbe,
{
    tokio::spawn(async move {
        let mut detector = ReconnectDetector::default();
        let mut ticker = tokio::time::interval(interval.max(MIN_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if trigger.is_closed() {
                break;
            }

            let reachable = probe.is_reachable().await;
            let was = detector.last();
            if detector.observe(reachable) {
                tracing::info!("Backend reachable again; requesting sync");
                trigger.request_sync();
            } else if was == Some(true) && !reachable {
                tracing::info!("Backend unreachable; queued reports will wait");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::{trigger_channel, WorkerEvent};
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct ScriptedProbe {
        samples: Mutex<VecDeque<bool>>,
    }

    impl ScriptedProbe {
        fn new(samples: &[bool]) -> Self {
            Self {
                samples: Mutex::new(samples.iter().copied().collect()),
            }
        }
    }

    impl ReachabilityProbe for ScriptedProbe {
        fn is_reachable(&self) -> impl Future<Output = bool> + Send {
            let next = self.samples.lock().unwrap().pop_front().unwrap_or(true);
            std::future::ready(next)
        }
    }

    #[test]
    fn detector_reports_only_offline_to_online() {
        let mut detector = ReconnectDetector::default();
        assert!(!detector.observe(true));
        assert!(!detector.observe(true));
        assert!(!detector.observe(false));
        assert!(!detector.observe(false));
        assert!(detector.observe(true));
        assert!(!detector.observe(true));
    }

    #[test]
    fn first_sample_offline_then_online_is_a_reconnect() {
        let mut detector = ReconnectDetector::default();
        assert!(!detector.observe(false));
        assert!(detector.observe(true));
    }

    #[test]
    fn probe_rejects_non_http_urls() {
        assert!(HttpReachabilityProbe::new("depot.local").is_err());
    }

    #[tokio::test]
    async fn reconnect_watch_requests_one_sync_per_transition() {
        let (trigger, mut listener) = trigger_channel(8);
        let handle = spawn_reconnect_watch(
            trigger,
            ScriptedProbe::new(&[true, false, false, true]),
            Duration::from_millis(10),
        );

        let event = tokio::time::timeout(Duration::from_secs(2), listener.next_event())
            .await
            .unwrap();
        assert_eq!(event, Some(WorkerEvent::SyncIssues));

        // Script exhausted: the probe stays online, so nothing further arrives.
        let quiet =
            tokio::time::timeout(Duration::from_millis(100), listener.next_event()).await;
        assert!(quiet.is_err());

        handle.abort();
    }

    #[tokio::test]
    async fn periodic_sync_stops_when_listener_drops() {
        let (trigger, mut listener) = trigger_channel(8);
        let handle = spawn_periodic_sync(trigger, Duration::from_millis(10));

        let event = tokio::time::timeout(Duration::from_secs(2), listener.next_event())
            .await
            .unwrap();
        assert_eq!(event, Some(WorkerEvent::SyncIssues));

        drop(listener);
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn http_probe_counts_error_statuses_as_reachable() {
        let server = MockServer::builder().start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let probe = HttpReachabilityProbe::new(server.uri()).unwrap();
        assert!(probe.is_reachable().await);

        drop(server);
        assert!(!probe.is_reachable().await);
    }
}
