//! Out-of-process keep-alive: pings the backend often enough that it never sleeps.
//!
//! Each [`KeepAlive`] owns its own coordinator, so its cooldown bookkeeping is
//! independent of any in-app coordinator talking to the same backend.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::AppConfig;
use crate::error::Result;
use crate::probe::{HttpProber, Prober};
use crate::wakeup::{WakeCoordinator, WakeOutcome};

/// Result of a single keep-alive run.
#[derive(Debug, Clone, Serialize)]
pub struct KeepAliveReport {
    pub success: bool,
    pub was_awake: bool,
    pub outcome: WakeOutcome,
    pub timestamp: DateTime<Utc>,
}

pub struct KeepAlive {
    coordinator: WakeCoordinator,
    interval: Duration,
}

impl KeepAlive {
    pub fn new(coordinator: WakeCoordinator, interval: Duration) -> Self {
        Self {
            coordinator,
            interval,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let prober: Arc<dyn Prober> = Arc::new(HttpProber::new(&config.backend_base_url)?);
        Ok(Self::new(
            WakeCoordinator::from_config(prober, config),
            config.scheduler.interval(),
        ))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Check the backend once and wake it if it looks asleep.
    pub async fn run_once(&self) -> KeepAliveReport {
        let timestamp = Utc::now();
        log::info!("[{}] Running keep-alive check...", timestamp.to_rfc3339());

        let outcome = self.coordinator.smart_wake_up().await;
        let success = outcome.is_awake();

        if outcome.was_awake {
            log::info!("Backend is already awake");
        } else if success {
            log::info!(
                "Backend woken after {} attempt(s) in {}ms",
                outcome.attempts,
                outcome.response_time_ms.unwrap_or_default()
            );
            if let Some(health) = &outcome.health {
                log::info!("Health check response: {}", health);
            }
        } else {
            log::error!("Failed to wake up backend: {}", outcome.message);
        }

        KeepAliveReport {
            success,
            was_awake: outcome.was_awake,
            outcome,
            timestamp,
        }
    }

    /// Run immediately, then once per interval. Never returns.
    pub async fn run_forever(&self) {
        log::info!(
            "Starting keep-alive service, checking every {} seconds",
            self.interval.as_secs()
        );
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.run_once().await;
        }
    }
}
