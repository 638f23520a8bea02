use std::time::Duration;

use crate::config::WakePolicy;

/// Delay slept after failed attempt `attempt` (1-based), before the next one.
///
/// `min(base * 2^(attempt-1), cap)`: with the defaults 1s, 2s, 4s, 8s, 10s, 10s...
pub fn backoff_delay(policy: &WakePolicy, attempt: u32) -> Duration {
    let factor = 1u64 << attempt.saturating_sub(1).min(32);
    let ms = policy.base_backoff_ms.saturating_mul(factor);
    Duration::from_millis(ms.min(policy.backoff_cap_ms))
}
