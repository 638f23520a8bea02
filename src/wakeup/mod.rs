//! Backend wake-up coordination.
//!
//! The hosting platform suspends the backend after a period of inactivity and
//! cold starts take tens of seconds. [`WakeCoordinator`] runs at most one wake
//! cycle at a time, racing probes against a few cheap endpoints with
//! exponential backoff between attempts. [`StatusReporter`] exposes the
//! resulting state to presentation layers.

mod backoff;
mod coordinator;
mod status;

use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;

pub use backoff::backoff_delay;
pub use coordinator::WakeCoordinator;
pub use status::{StatusReporter, WakeStatus, DEFAULT_POLL_INTERVAL};

/// Coordinator phase. `Awake` and `Error` decay to `Idle` once the cooldown expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WakePhase {
    Idle,
    Waking,
    Awake,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WakeOutcomeStatus {
    Awake,
    Error,
}

/// Structured result of `ensure_awake` and friends. Callers that joined the
/// same cycle receive equal outcomes, including `cycle_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WakeOutcome {
    /// `None` when no cycle ran (cooldown, or a sleep check found the backend awake).
    pub cycle_id: Option<Uuid>,
    pub status: WakeOutcomeStatus,
    pub attempts: u32,
    pub response_time_ms: Option<u64>,
    /// Delays slept between attempts, in order.
    pub backoff_ms: Vec<u64>,
    pub message: String,
    /// True when the backend was already responsive and no cycle was needed.
    pub was_awake: bool,
    /// Body of the probe that proved the backend awake, if it was JSON.
    pub health: Option<serde_json::Value>,
}

impl WakeOutcome {
    pub(crate) fn already_awake(message: impl Into<String>) -> Self {
        Self {
            cycle_id: None,
            status: WakeOutcomeStatus::Awake,
            attempts: 0,
            response_time_ms: None,
            backoff_ms: Vec::new(),
            message: message.into(),
            was_awake: true,
            health: None,
        }
    }

    pub fn is_awake(&self) -> bool {
        self.status == WakeOutcomeStatus::Awake
    }

    /// Terminal error for a failed cycle, carrying the last observed failure.
    pub fn to_error(&self) -> AppError {
        AppError::exhausted_retries(self.attempts, &self.message)
    }
}

/// Notifications published by the coordinator and the request layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WakeEvent {
    CycleStarted {
        cycle_id: Uuid,
    },
    AttemptFailed {
        cycle_id: Uuid,
        attempt: u32,
        error: String,
        retry_in_ms: Option<u64>,
    },
    CycleSucceeded {
        cycle_id: Uuid,
        attempts: u32,
        response_time_ms: u64,
    },
    CycleFailed {
        cycle_id: Uuid,
        attempts: u32,
        error: String,
    },
    /// A request failed with a sleep signature and waking the backend did not help.
    BackendUnavailable {
        request: String,
        error: String,
    },
}
