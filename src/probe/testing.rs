//! Scripted prober used by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{ProbeResult, Prober};

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Status(u16),
    Timeout,
    Network,
    Hang,
}

/// One scripted probe response.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Step {
    delay: Duration,
    outcome: Outcome,
}

impl Step {
    pub(crate) fn status(code: u16, after_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(after_ms),
            outcome: Outcome::Status(code),
        }
    }

    /// Waits out the full probe timeout, then reports a timeout.
    pub(crate) fn timeout() -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Outcome::Timeout,
        }
    }

    pub(crate) fn network() -> Self {
        Self {
            delay: Duration::from_millis(5),
            outcome: Outcome::Network,
        }
    }

    /// Never resolves.
    pub(crate) fn hang() -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Outcome::Hang,
        }
    }
}

/// Plays back per-endpoint scripts, then a shared queue, then a default step.
pub(crate) struct ScriptedProber {
    default: Step,
    shared: Mutex<VecDeque<Step>>,
    per_endpoint: Mutex<HashMap<String, VecDeque<Step>>>,
    log: Mutex<Vec<(String, Duration)>>,
}

impl ScriptedProber {
    pub(crate) fn new(default: Step) -> Self {
        Self {
            default,
            shared: Mutex::new(VecDeque::new()),
            per_endpoint: Mutex::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn then(self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.shared.lock().unwrap().extend(steps);
        self
    }

    pub(crate) fn on(self, endpoint: &str, steps: impl IntoIterator<Item = Step>) -> Self {
        self.per_endpoint
            .lock()
            .unwrap()
            .entry(endpoint.to_string())
            .or_default()
            .extend(steps);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    pub(crate) fn calls_to(&self, endpoint: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(ep, _)| ep == endpoint)
            .count()
    }

    pub(crate) fn timeouts(&self) -> Vec<Duration> {
        self.log.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }

    fn next_step(&self, endpoint: &str) -> Step {
        if let Some(step) = self
            .per_endpoint
            .lock()
            .unwrap()
            .get_mut(endpoint)
            .and_then(VecDeque::pop_front)
        {
            return step;
        }
        self.shared.lock().unwrap().pop_front().unwrap_or(self.default)
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, endpoint: &str, timeout: Duration) -> ProbeResult {
        self.log
            .lock()
            .unwrap()
            .push((endpoint.to_string(), timeout));
        let step = self.next_step(endpoint);

        match step.outcome {
            Outcome::Status(code) => {
                tokio::time::sleep(step.delay).await;
                ProbeResult::from_status(endpoint, code, step.delay)
            }
            Outcome::Timeout => {
                tokio::time::sleep(timeout).await;
                ProbeResult::timeout(endpoint, timeout, timeout)
            }
            Outcome::Network => {
                tokio::time::sleep(step.delay).await;
                ProbeResult::network(endpoint, step.delay, "connection refused")
            }
            Outcome::Hang => std::future::pending().await,
        }
    }
}
