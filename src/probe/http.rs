//! reqwest-backed health probe.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::Client;
use tokio::time::Instant;

use super::{join_url, ProbeResult, Prober};
use crate::error::Result;

/// Probes `base_url + endpoint` with caching disabled.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
    base_url: String,
}

impl HttpProber {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, endpoint: &str, timeout: Duration) -> ProbeResult {
        let url = join_url(&self.base_url, endpoint);
        let start = Instant::now();

        let request = self
            .client
            .get(&url)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .timeout(timeout)
            .send();

        let resp = match tokio::time::timeout(timeout, request).await {
            Err(_) => return ProbeResult::timeout(endpoint, start.elapsed(), timeout),
            Ok(Err(e)) if e.is_timeout() => {
                return ProbeResult::timeout(endpoint, start.elapsed(), timeout)
            }
            Ok(Err(e)) => return ProbeResult::network(endpoint, start.elapsed(), e.to_string()),
            Ok(Ok(resp)) => resp,
        };

        let elapsed = start.elapsed();
        let status = resp.status();
        let result = ProbeResult::from_status(endpoint, status.as_u16(), elapsed);
        if !status.is_success() {
            return result;
        }

        // The body is informational only; a slow or malformed body does not fail the probe.
        let remaining = timeout.saturating_sub(elapsed);
        let body = match tokio::time::timeout(remaining, resp.json::<serde_json::Value>()).await {
            Ok(Ok(value)) => Some(value),
            _ => None,
        };
        result.with_body(body)
    }
}
