//! Health probing against the backend.

mod detector;
mod http;

#[cfg(test)]
pub(crate) mod testing;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

pub use detector::{classify_sleep, SleepDetector};
pub use http::HttpProber;

/// Why a probe did not count as a success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeErrorKind {
    Timeout,
    Network,
    ServerError,
}

/// Outcome of a single probe. Never an error: failures are classified instead.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub endpoint: String,
    pub succeeded: bool,
    pub http_status: Option<u16>,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    pub error_kind: Option<ProbeErrorKind>,
    pub error: Option<String>,
    /// Decoded JSON body of a successful response, when there was one.
    pub body: Option<serde_json::Value>,
}

impl ProbeResult {
    /// Classify a received response. 5xx is a failure even though the server answered.
    pub fn from_status(endpoint: &str, status: u16, elapsed: Duration) -> Self {
        if status >= 500 {
            Self {
                endpoint: endpoint.to_string(),
                succeeded: false,
                http_status: Some(status),
                elapsed,
                error_kind: Some(ProbeErrorKind::ServerError),
                error: Some(format!("HTTP {}", status)),
                body: None,
            }
        } else {
            Self {
                endpoint: endpoint.to_string(),
                succeeded: true,
                http_status: Some(status),
                elapsed,
                error_kind: None,
                error: None,
                body: None,
            }
        }
    }

    pub fn timeout(endpoint: &str, elapsed: Duration, limit: Duration) -> Self {
        Self::failed(
            endpoint,
            elapsed,
            ProbeErrorKind::Timeout,
            format!("no response within {}ms", limit.as_millis()),
        )
    }

    pub fn network(endpoint: &str, elapsed: Duration, detail: impl Into<String>) -> Self {
        Self::failed(endpoint, elapsed, ProbeErrorKind::Network, detail.into())
    }

    fn failed(endpoint: &str, elapsed: Duration, kind: ProbeErrorKind, detail: String) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            succeeded: false,
            http_status: None,
            elapsed,
            error_kind: Some(kind),
            error: Some(detail),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Option<serde_json::Value>) -> Self {
        self.body = body;
        self
    }

    /// Counts as "backend is up" for a wake cycle.
    pub fn is_awake(&self) -> bool {
        self.succeeded && self.http_status.is_none_or(|status| status < 500)
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX)
    }

    /// Short human readable failure description.
    pub fn describe(&self) -> String {
        match (&self.error, self.http_status) {
            (Some(detail), _) => format!("{}: {}", self.endpoint, detail),
            (None, Some(status)) => format!("{}: HTTP {}", self.endpoint, status),
            (None, None) => format!("{}: ok", self.endpoint),
        }
    }
}

fn serialize_millis<S>(value: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
}

/// Issues a lightweight GET against one backend path.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, endpoint: &str, timeout: Duration) -> ProbeResult;
}

/// Slack granted to a prober past its own timeout before the caller stops waiting on it.
const PROBE_GRACE: Duration = Duration::from_secs(1);

/// Run one probe, but never wait much longer than `timeout` for it.
///
/// A prober that ignores its own deadline is reported as a timeout.
pub async fn probe_with_deadline(
    prober: &dyn Prober,
    endpoint: &str,
    timeout: Duration,
) -> ProbeResult {
    match tokio::time::timeout(timeout + PROBE_GRACE, prober.probe(endpoint, timeout)).await {
        Ok(result) => result,
        Err(_) => {
            log::warn!("Probe of {} overran its {:?} deadline", endpoint, timeout);
            ProbeResult::timeout(endpoint, timeout + PROBE_GRACE, timeout)
        }
    }
}

/// Join a base URL and a path without doubling or dropping the slash.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.is_empty() {
        base.to_string()
    } else if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}
