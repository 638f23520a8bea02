//! Wake cycle coordination shared by every caller in the process.

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, Shared};
use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt as _, StreamExt as _};
use tokio::sync::broadcast;
use tokio::time::Instant;
use uuid::Uuid;

use super::backoff::backoff_delay;
use super::status::WakeStatus;
use super::{WakeEvent, WakeOutcome, WakeOutcomeStatus, WakePhase};
use crate::config::{AppConfig, WakePolicy};
use crate::probe::{probe_with_deadline, ProbeResult, Prober, SleepDetector};

type PendingCycle = Shared<BoxFuture<'static, WakeOutcome>>;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug)]
struct WakeState {
    phase: WakePhase,
    phase_since: Instant,
    /// Monotonic time of the last successful wake; gates the cooldown.
    last_wake_at: Option<Instant>,
    last_wake_timestamp: Option<DateTime<Utc>>,
    last_error: Option<String>,
    last_response_time_ms: Option<u64>,
}

impl WakeState {
    fn new() -> Self {
        Self {
            phase: WakePhase::Idle,
            phase_since: Instant::now(),
            last_wake_at: None,
            last_wake_timestamp: None,
            last_error: None,
            last_response_time_ms: None,
        }
    }

    fn enter(&mut self, phase: WakePhase) {
        self.phase = phase;
        self.phase_since = Instant::now();
    }
}

enum Gate {
    /// Skip the cycle while the last successful wake is within the cooldown.
    Cooldown,
    Always,
}

struct Inner {
    prober: Arc<dyn Prober>,
    detector: SleepDetector,
    policy: WakePolicy,
    endpoints: Vec<String>,
    state: RwLock<WakeState>,
    in_flight: Mutex<Option<(Uuid, PendingCycle)>>,
    events: broadcast::Sender<WakeEvent>,
}

/// Serializes wake-up attempts: concurrent callers attach to the running cycle.
///
/// Cloning is cheap and every clone shares the same state. Construct one per
/// process at the composition root and hand clones to whatever issues requests.
#[derive(Clone)]
pub struct WakeCoordinator {
    inner: Arc<Inner>,
}

impl WakeCoordinator {
    pub fn new(
        prober: Arc<dyn Prober>,
        policy: WakePolicy,
        health_path: &str,
        endpoints: Vec<String>,
    ) -> Self {
        let detector = SleepDetector::new(Arc::clone(&prober), health_path, &policy);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                prober,
                detector,
                policy,
                endpoints,
                state: RwLock::new(WakeState::new()),
                in_flight: Mutex::new(None),
                events,
            }),
        }
    }

    pub fn from_config(prober: Arc<dyn Prober>, config: &AppConfig) -> Self {
        Self::new(
            prober,
            config.policy.clone(),
            &config.health_path,
            config.wake_endpoints.clone(),
        )
    }

    pub fn policy(&self) -> &WakePolicy {
        &self.inner.policy
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<WakeEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn emit(&self, event: WakeEvent) {
        let _ = self.inner.events.send(event);
    }

    /// Succeed immediately inside the cooldown window, otherwise run or join a cycle.
    pub async fn ensure_awake(&self) -> WakeOutcome {
        self.run_gated(Gate::Cooldown).await
    }

    /// Clear the cooldown gate and run (or join) a cycle.
    pub async fn force_wake_up(&self) -> WakeOutcome {
        self.write_state(|state| {
            state.last_wake_at = None;
            state.last_wake_timestamp = None;
        });
        self.wake_up_with_retries().await
    }

    /// Run a bounded retry cycle, or wait for the one already running.
    pub async fn wake_up_with_retries(&self) -> WakeOutcome {
        self.run_gated(Gate::Always).await
    }

    /// Join a running cycle, otherwise probe once and only start a cycle if
    /// the backend looks asleep.
    pub async fn smart_wake_up(&self) -> WakeOutcome {
        if let Some(pending) = self.current_cycle() {
            return pending.await;
        }
        if !self.inner.detector.looks_asleep().await {
            return WakeOutcome::already_awake("Backend is already awake");
        }
        log::info!("Backend appears to be sleeping, initiating wake-up...");
        self.wake_up_with_retries().await
    }

    pub fn is_waking(&self) -> bool {
        self.current_cycle().is_some()
    }

    /// Snapshot of the current wake state.
    pub fn status(&self) -> WakeStatus {
        let cooldown = self.inner.policy.cooldown();
        let state = self.inner.state.read().unwrap_or_else(|e| e.into_inner());

        let phase = match state.phase {
            WakePhase::Awake | WakePhase::Error if state.phase_since.elapsed() >= cooldown => {
                WakePhase::Idle
            }
            phase => phase,
        };
        let since_wake = state.last_wake_at.map(|at| at.elapsed());

        WakeStatus {
            phase,
            is_waking: state.phase == WakePhase::Waking,
            last_wake_timestamp: state.last_wake_timestamp,
            time_since_last_wake_ms: since_wake.map(millis),
            needs_wake_up: since_wake.is_none_or(|elapsed| elapsed >= cooldown),
            last_error: state.last_error.clone(),
            last_response_time_ms: state.last_response_time_ms,
        }
    }

    /// Forget all bookkeeping. Refused while a cycle is running.
    pub fn reset(&self) -> bool {
        let in_flight = self.inner.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if in_flight.is_some() {
            return false;
        }
        self.write_state(|state| *state = WakeState::new());
        true
    }

    async fn run_gated(&self, gate: Gate) -> WakeOutcome {
        match self.begin(gate) {
            Some(pending) => pending.await,
            None => WakeOutcome::already_awake("Backend was recently awakened"),
        }
    }

    fn current_cycle(&self) -> Option<PendingCycle> {
        let in_flight = self.inner.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.as_ref().map(|(_, pending)| pending.clone())
    }

    /// Attach to the running cycle or start one. `None` means the cooldown applies.
    fn begin(&self, gate: Gate) -> Option<PendingCycle> {
        let mut in_flight = self.inner.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((_, pending)) = in_flight.as_ref() {
            return Some(pending.clone());
        }
        if matches!(gate, Gate::Cooldown) && self.within_cooldown() {
            return None;
        }

        let cycle_id = Uuid::new_v4();
        let pending = self.launch(cycle_id);
        *in_flight = Some((cycle_id, pending.clone()));
        Some(pending)
    }

    fn within_cooldown(&self) -> bool {
        let cooldown = self.inner.policy.cooldown();
        let state = self.inner.state.read().unwrap_or_else(|e| e.into_inner());
        state.last_wake_at.is_some_and(|at| at.elapsed() < cooldown)
    }

    /// Spawn the cycle so it runs to completion even if every caller goes away.
    fn launch(&self, cycle_id: Uuid) -> PendingCycle {
        self.write_state(|state| state.enter(WakePhase::Waking));

        let worker = self.clone();
        let handle = tokio::spawn(async move { worker.run_cycle(cycle_id).await });

        let this = self.clone();
        async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let message = format!("Wake cycle aborted: {}", e);
                    log::error!("{} (cycle {})", message, cycle_id);
                    this.record_failure(&message);
                    this.finish(cycle_id);
                    failed_outcome(cycle_id, 0, Vec::new(), message)
                }
            }
        }
        .boxed()
        .shared()
    }

    async fn run_cycle(&self, cycle_id: Uuid) -> WakeOutcome {
        let policy = &self.inner.policy;
        let max_attempts = policy.max_retries.max(1);
        let mut backoff_ms = Vec::new();
        let mut last_error = String::new();

        self.emit(WakeEvent::CycleStarted { cycle_id });
        log::info!(
            "Starting wake-up cycle {} against {} endpoint(s)",
            cycle_id,
            self.inner.endpoints.len()
        );

        for attempt in 1..=max_attempts {
            log::info!("Wake-up attempt {}/{}", attempt, max_attempts);

            match self.race_endpoints().await {
                Ok(result) => {
                    let response_time_ms = result.elapsed_ms();
                    log::info!(
                        "Backend awake after {} attempt(s): {} answered in {}ms",
                        attempt,
                        result.endpoint,
                        response_time_ms
                    );
                    self.record_success(response_time_ms);
                    self.emit(WakeEvent::CycleSucceeded {
                        cycle_id,
                        attempts: attempt,
                        response_time_ms,
                    });
                    self.finish(cycle_id);

                    return WakeOutcome {
                        cycle_id: Some(cycle_id),
                        status: WakeOutcomeStatus::Awake,
                        attempts: attempt,
                        response_time_ms: Some(response_time_ms),
                        backoff_ms,
                        message: format!("Backend is awake ({} answered)", result.endpoint),
                        was_awake: false,
                        health: result.body,
                    };
                }
                Err(error) => {
                    let retry_in = (attempt < max_attempts).then(|| backoff_delay(policy, attempt));
                    log::warn!(
                        "Wake-up attempt {}/{} failed: {}",
                        attempt,
                        max_attempts,
                        error
                    );
                    self.emit(WakeEvent::AttemptFailed {
                        cycle_id,
                        attempt,
                        error: error.clone(),
                        retry_in_ms: retry_in.map(millis),
                    });
                    last_error = error;

                    if let Some(delay) = retry_in {
                        log::info!("Waiting {}ms before retry...", millis(delay));
                        tokio::time::sleep(delay).await;
                        backoff_ms.push(millis(delay));
                    }
                }
            }
        }

        let message = format!(
            "Failed to wake up backend after {} attempts: {}",
            max_attempts, last_error
        );
        log::error!("{}", message);
        self.record_failure(&message);
        self.emit(WakeEvent::CycleFailed {
            cycle_id,
            attempts: max_attempts,
            error: last_error,
        });
        self.finish(cycle_id);

        failed_outcome(cycle_id, max_attempts, backoff_ms, message)
    }

    /// Probe every endpoint at once; the first awake answer wins and the
    /// remaining probes are dropped, which cancels their requests.
    async fn race_endpoints(&self) -> Result<ProbeResult, String> {
        let timeout = self.inner.policy.probe_timeout();
        let prober = self.inner.prober.as_ref();

        let mut probes: FuturesUnordered<_> = self
            .inner
            .endpoints
            .iter()
            .map(|endpoint| probe_with_deadline(prober, endpoint, timeout))
            .collect();

        let mut failures = Vec::new();
        while let Some(result) = probes.next().await {
            if result.is_awake() {
                return Ok(result);
            }
            failures.push(result.describe());
        }
        Err(failures.join("; "))
    }

    fn write_state(&self, f: impl FnOnce(&mut WakeState)) {
        let mut state = self.inner.state.write().unwrap_or_else(|e| e.into_inner());
        f(&mut state);
    }

    fn record_success(&self, response_time_ms: u64) {
        self.write_state(|state| {
            state.enter(WakePhase::Awake);
            state.last_wake_at = Some(Instant::now());
            state.last_wake_timestamp = Some(Utc::now());
            state.last_response_time_ms = Some(response_time_ms);
            state.last_error = None;
        });
    }

    fn record_failure(&self, message: &str) {
        self.write_state(|state| {
            state.enter(WakePhase::Error);
            state.last_error = Some(message.to_string());
        });
    }

    /// Release the in-flight slot. State must already reflect the outcome.
    fn finish(&self, cycle_id: Uuid) {
        let mut in_flight = self.inner.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if in_flight.as_ref().is_some_and(|(id, _)| *id == cycle_id) {
            *in_flight = None;
        }
    }
}

fn failed_outcome(
    cycle_id: Uuid,
    attempts: u32,
    backoff_ms: Vec<u64>,
    message: String,
) -> WakeOutcome {
    WakeOutcome {
        cycle_id: Some(cycle_id),
        status: WakeOutcomeStatus::Error,
        attempts,
        response_time_ms: None,
        backoff_ms,
        message,
        was_awake: false,
        health: None,
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
