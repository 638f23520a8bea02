//! Decides whether the backend is currently suspended.

use std::sync::Arc;
use std::time::Duration;

use super::{probe_with_deadline, ProbeResult, Prober};
use crate::config::WakePolicy;

/// Quick single-probe sleep check against the health path.
#[derive(Clone)]
pub struct SleepDetector {
    prober: Arc<dyn Prober>,
    health_path: String,
    timeout: Duration,
    latency_threshold: Duration,
}

impl SleepDetector {
    pub fn new(
        prober: Arc<dyn Prober>,
        health_path: impl Into<String>,
        policy: &WakePolicy,
    ) -> Self {
        Self {
            prober,
            health_path: health_path.into(),
            timeout: policy.sleep_check_timeout(),
            latency_threshold: policy.sleep_latency_threshold(),
        }
    }

    /// True when the backend looks asleep. A probe that never answers counts as asleep.
    pub async fn looks_asleep(&self) -> bool {
        let result =
            probe_with_deadline(self.prober.as_ref(), &self.health_path, self.timeout).await;
        let asleep = classify_sleep(&result, self.latency_threshold);
        log::debug!(
            "Sleep check {}: {} in {}ms",
            if asleep { "failed" } else { "passed" },
            result.describe(),
            result.elapsed_ms()
        );
        asleep
    }
}

/// Sleep signature: outright failure, a gateway status, or a slow answer.
pub fn classify_sleep(result: &ProbeResult, latency_threshold: Duration) -> bool {
    !result.succeeded
        || matches!(result.http_status, Some(502..=504))
        || result.elapsed > latency_threshold
}
