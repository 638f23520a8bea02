//! Wraps outbound API calls with credentials and wake-and-retry-once handling.

use std::future::Future;
use std::sync::Arc;

use super::session::Session;
use crate::error::Result;
use crate::wakeup::{WakeCoordinator, WakeEvent};

/// Per-attempt request metadata handed to the wrapped request function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Ready-to-send `Authorization` header value.
    pub authorization: Option<String>,
    /// Set on the single wake-up retry.
    pub retried: bool,
}

#[derive(Clone)]
pub struct Interceptor {
    coordinator: WakeCoordinator,
    session: Arc<dyn Session>,
    auth_scheme: String,
}

impl Interceptor {
    pub fn new(
        coordinator: WakeCoordinator,
        session: Arc<dyn Session>,
        auth_scheme: impl Into<String>,
    ) -> Self {
        Self {
            coordinator,
            session,
            auth_scheme: auth_scheme.into(),
        }
    }

    pub fn coordinator(&self) -> &WakeCoordinator {
        &self.coordinator
    }

    pub fn context(&self, retried: bool) -> RequestContext {
        RequestContext {
            authorization: self
                .session
                .token()
                .map(|token| format!("{} {}", self.auth_scheme, token)),
            retried,
        }
    }

    /// Invoke `request` with credentials attached.
    ///
    /// A 401 clears the session and redirects to sign-in without retrying. A
    /// sleep-signature failure wakes the backend and, if that worked, reissues
    /// the request exactly once. Otherwise the original error is returned as is.
    pub async fn call<A, T, F, Fut>(&self, name: &str, args: A, request: F) -> Result<T>
    where
        A: Clone,
        F: Fn(RequestContext, A) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let err = match request(self.context(false), args.clone()).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if err.is_auth() {
            self.handle_unauthorized(name);
            return Err(err);
        }
        if !err.is_sleep_signature() {
            return Err(err);
        }

        log::warn!(
            "Request {} failed ({}), backend may be asleep; attempting wake-up...",
            name,
            err
        );
        let outcome = self.coordinator.smart_wake_up().await;
        if !outcome.is_awake() {
            log::error!("Failed to wake up backend for {}: {}", name, outcome.message);
            self.report_unavailable(name, &outcome.message);
            return Err(err);
        }

        log::info!("Backend awake, retrying {} once", name);
        match request(self.context(true), args).await {
            Ok(value) => Ok(value),
            Err(retry_err) => {
                if retry_err.is_auth() {
                    self.handle_unauthorized(name);
                } else if retry_err.is_sleep_signature() {
                    self.report_unavailable(name, &retry_err.to_string());
                }
                Err(retry_err)
            }
        }
    }

    /// [`call`](Self::call), preceded by [`WakeCoordinator::ensure_awake`].
    ///
    /// Within the cooldown window the pre-wake costs nothing. The request is
    /// issued even if the backend could not be woken.
    pub async fn call_awake<A, T, F, Fut>(&self, name: &str, args: A, request: F) -> Result<T>
    where
        A: Clone,
        F: Fn(RequestContext, A) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let outcome = self.coordinator.ensure_awake().await;
        if !outcome.is_awake() {
            log::warn!("Backend did not wake before {}: {}", name, outcome.message);
        }
        self.call(name, args, request).await
    }

    fn handle_unauthorized(&self, name: &str) {
        log::warn!("Request {} was unauthorized, clearing session", name);
        self.session.clear();
        self.session.redirect_to_sign_in();
    }

    fn report_unavailable(&self, name: &str, error: &str) {
        self.coordinator.emit(WakeEvent::BackendUnavailable {
            request: name.to_string(),
            error: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::api::session::MemorySession;
    use crate::config::WakePolicy;
    use crate::error::{AppError, ErrorKind};
    use crate::probe::testing::{ScriptedProber, Step};
    use crate::probe::Prober;

    struct Harness {
        prober: Arc<ScriptedProber>,
        session: Arc<MemorySession>,
        interceptor: Interceptor,
    }

    fn harness(prober: ScriptedProber, session: MemorySession) -> Harness {
        let prober = Arc::new(prober);
        let session = Arc::new(session);
        let coordinator = WakeCoordinator::new(
            Arc::clone(&prober) as Arc<dyn Prober>,
            WakePolicy::default(),
            "/health/",
            vec!["/health/".to_string()],
        );
        let interceptor = Interceptor::new(
            coordinator,
            Arc::clone(&session) as Arc<dyn Session>,
            "Bearer",
        );
        Harness {
            prober,
            session,
            interceptor,
        }
    }

    /// Request function that replays `responses` and records each context it saw.
    fn scripted(
        responses: Vec<Result<u32>>,
    ) -> (
        Arc<Mutex<Vec<RequestContext>>>,
        impl Fn(RequestContext, u32) -> std::future::Ready<Result<u32>>,
    ) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let responses = Mutex::new(responses.into_iter());
        let log = Arc::clone(&seen);
        let request = move |ctx: RequestContext, _arg: u32| {
            log.lock().unwrap().push(ctx);
            let next = responses
                .lock()
                .unwrap()
                .next()
                .unwrap_or_else(|| Err(AppError::other("script exhausted")));
            std::future::ready(next)
        };
        (seen, request)
    }

    #[tokio::test(start_paused = true)]
    async fn attaches_bearer_token() {
        let h = harness(
            ScriptedProber::new(Step::status(200, 10)),
            MemorySession::with_token("abc"),
        );
        let (seen, request) = scripted(vec![Ok(7)]);

        assert_eq!(h.interceptor.call("games", 1, request).await.unwrap(), 7);
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].authorization.as_deref(), Some("Bearer abc"));
        assert!(!seen[0].retried);
    }

    #[tokio::test(start_paused = true)]
    async fn omits_header_without_token() {
        let h = harness(ScriptedProber::new(Step::status(200, 10)), MemorySession::new());
        let (seen, request) = scripted(vec![Ok(1)]);

        h.interceptor.call("games", 1, request).await.unwrap();
        assert_eq!(seen.lock().unwrap()[0].authorization, None);
    }

    #[tokio::test(start_paused = true)]
    async fn unauthorized_clears_session_and_is_not_retried() {
        let h = harness(
            ScriptedProber::new(Step::status(200, 10)),
            MemorySession::with_token("stale"),
        );
        let (seen, request) = scripted(vec![Err(AppError::unauthorized()), Ok(1)]);

        let err = h.interceptor.call("profile", 1, request).await.unwrap_err();

        assert!(err.is_auth());
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(h.session.token(), None);
        assert_eq!(h.session.redirect_count(), 1);
        assert_eq!(h.prober.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_failure_is_retried_once_after_wake() {
        let h = harness(
            ScriptedProber::new(Step::status(200, 100)).then([Step::timeout()]),
            MemorySession::new(),
        );
        let (seen, request) = scripted(vec![Err(AppError::http_status(503, "")), Ok(42)]);

        let value = h.interceptor.call("create_booking", 1, request).await.unwrap();

        assert_eq!(value, 42);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[1].retried);
        assert!(h.prober.calls() >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn two_sleep_failures_retry_only_once() {
        let h = harness(ScriptedProber::new(Step::status(200, 10)), MemorySession::new());
        let (seen, request) = scripted(vec![
            Err(AppError::timeout("first")),
            Err(AppError::timeout("second")),
            Ok(1),
        ]);
        let mut events = h.interceptor.coordinator().subscribe_events();

        let err = h.interceptor.call("games", 1, request).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.to_string().contains("second"));
        assert_eq!(seen.lock().unwrap().len(), 2);
        assert!(matches!(
            events.try_recv(),
            Ok(WakeEvent::BackendUnavailable { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_wake_propagates_original_error() {
        let h = harness(ScriptedProber::new(Step::network()), MemorySession::new());
        let (seen, request) = scripted(vec![Err(AppError::http_status(502, "")), Ok(1)]);
        let mut events = h.interceptor.coordinator().subscribe_events();

        let err = h.interceptor.call("games", 1, request).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ServerError);
        assert_eq!(err.status(), Some(502));
        assert_eq!(seen.lock().unwrap().len(), 1);

        let mut unavailable = false;
        while let Ok(event) = events.try_recv() {
            unavailable |= matches!(event, WakeEvent::BackendUnavailable { .. });
        }
        assert!(unavailable);
    }

    #[tokio::test(start_paused = true)]
    async fn ordinary_errors_pass_straight_through() {
        let h = harness(ScriptedProber::new(Step::status(200, 10)), MemorySession::new());
        let (seen, request) = scripted(vec![
            Err(AppError::http_status(500, "{\"error\":\"validation\"}")),
            Ok(1),
        ]);

        let err = h.interceptor.call("create_booking", 1, request).await.unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(h.prober.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pre_wake_is_skipped_inside_cooldown() {
        let h = harness(ScriptedProber::new(Step::status(200, 10)), MemorySession::new());
        let (seen, request) = scripted(vec![Ok(1), Ok(2)]);

        assert_eq!(h.interceptor.call_awake("games", 1, &request).await.unwrap(), 1);
        assert_eq!(h.prober.calls(), 1);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(h.interceptor.call_awake("games", 1, &request).await.unwrap(), 2);

        assert_eq!(h.prober.calls(), 1);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_pre_wake_still_issues_request() {
        let h = harness(ScriptedProber::new(Step::network()), MemorySession::new());
        let (seen, request) = scripted(vec![Ok(5)]);

        assert_eq!(h.interceptor.call_awake("games", 1, request).await.unwrap(), 5);
        assert_eq!(h.prober.calls(), 3);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shared_counter_sees_each_attempt() {
        let h = harness(ScriptedProber::new(Step::status(200, 10)), MemorySession::new());
        let attempts = AtomicUsize::new(0);

        let result: Result<()> = h
            .interceptor
            .call("ping", (), |_, ()| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::network("refused")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
