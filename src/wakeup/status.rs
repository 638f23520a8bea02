//! Read-only view of the wake state for presentation layers.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use super::{WakeCoordinator, WakePhase};

/// Poll period used by the status widgets.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Point-in-time snapshot of the wake state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WakeStatus {
    pub phase: WakePhase,
    pub is_waking: bool,
    pub last_wake_timestamp: Option<DateTime<Utc>>,
    pub time_since_last_wake_ms: Option<u64>,
    /// The cooldown has expired (or no wake ever succeeded).
    pub needs_wake_up: bool,
    pub last_error: Option<String>,
    pub last_response_time_ms: Option<u64>,
}

/// Thin facade over [`WakeCoordinator`] returning plain values.
#[derive(Clone)]
pub struct StatusReporter {
    coordinator: WakeCoordinator,
}

impl StatusReporter {
    pub fn new(coordinator: WakeCoordinator) -> Self {
        Self { coordinator }
    }

    pub fn get_status(&self) -> WakeStatus {
        self.coordinator.status()
    }

    pub async fn wake_up(&self) -> bool {
        self.coordinator.ensure_awake().await.is_awake()
    }

    pub async fn force_wake_up(&self) -> bool {
        self.coordinator.force_wake_up().await.is_awake()
    }

    pub fn reset(&self) -> bool {
        self.coordinator.reset()
    }

    /// Publish a fresh snapshot every `interval` until all receivers are dropped.
    pub fn watch(&self, interval: Duration) -> watch::Receiver<WakeStatus> {
        let (tx, rx) = watch::channel(self.get_status());
        let reporter = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    () = tx.closed() => break,
                }
                if tx.send(reporter.get_status()).is_err() {
                    break;
                }
            }
            log::debug!("Wake status poller stopped");
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::WakePolicy;
    use crate::probe::testing::{ScriptedProber, Step};
    use crate::probe::Prober;

    fn reporter(prober: &Arc<ScriptedProber>) -> StatusReporter {
        StatusReporter::new(WakeCoordinator::new(
            Arc::clone(prober) as Arc<dyn Prober>,
            WakePolicy::default(),
            "/health/",
            vec!["/health/".to_string()],
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_status_is_idle_and_needs_wake_up() {
        let prober = Arc::new(ScriptedProber::new(Step::status(200, 10)));
        let status = reporter(&prober).get_status();

        assert_eq!(status.phase, WakePhase::Idle);
        assert!(status.needs_wake_up);
        assert!(status.last_wake_timestamp.is_none());
        assert!(status.time_since_last_wake_ms.is_none());
        assert_eq!(prober.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn wake_up_returns_plain_bool() {
        let prober = Arc::new(ScriptedProber::new(Step::status(200, 10)));
        let reporter = reporter(&prober);

        assert!(reporter.wake_up().await);
        let status = reporter.get_status();
        assert_eq!(status.phase, WakePhase::Awake);
        assert_eq!(status.time_since_last_wake_ms, Some(0));

        assert!(reporter.force_wake_up().await);
        assert_eq!(prober.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_wake_up_returns_false() {
        let prober = Arc::new(ScriptedProber::new(Step::network()));
        let reporter = reporter(&prober);

        assert!(!reporter.wake_up().await);
        assert_eq!(reporter.get_status().phase, WakePhase::Error);
        assert!(reporter.reset());
        assert_eq!(reporter.get_status().phase, WakePhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn watcher_publishes_updates() {
        let prober = Arc::new(ScriptedProber::new(Step::status(200, 10)));
        let reporter = reporter(&prober);
        let mut rx = reporter.watch(DEFAULT_POLL_INTERVAL);
        assert_eq!(rx.borrow_and_update().phase, WakePhase::Idle);

        reporter.wake_up().await;
        let saw_awake = tokio::time::timeout(Duration::from_secs(20), async {
            loop {
                rx.changed().await.unwrap();
                if rx.borrow().phase == WakePhase::Awake {
                    break;
                }
            }
        })
        .await;

        assert!(saw_awake.is_ok());
    }
}
