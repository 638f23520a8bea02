use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::paths::config_path;

/// Environment variable holding the backend origin.
pub const BACKEND_BASE_URL_ENV: &str = "BACKEND_BASE_URL";

const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Load the config from its default location, then apply environment overrides.
pub fn load_config() -> Result<AppConfig> {
    load_config_from(&config_path())
}

/// Load the config from `path`. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let mut config = if path.exists() {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)?
    } else {
        log::debug!("No config file at {:?}, using defaults", path);
        AppConfig::default()
    };

    if let Ok(url) = std::env::var(BACKEND_BASE_URL_ENV) {
        if !url.trim().is_empty() {
            config.backend_base_url = url.trim().to_string();
        }
    }

    config.validate()?;
    Ok(config)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Backend origin, without the API prefix.
    pub backend_base_url: String,
    /// Path probed for sleep detection.
    pub health_path: String,
    /// Paths raced on each wake attempt.
    pub wake_endpoints: Vec<String>,
    /// Prefix prepended to resource endpoints.
    pub api_prefix: String,
    /// Authorization scheme, e.g. `Bearer` or `Token`.
    pub auth_scheme: String,
    pub request_timeout_ms: u64,
    pub policy: WakePolicy,
    pub scheduler: SchedulerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_base_url: DEFAULT_BASE_URL.to_string(),
            health_path: "/health/".to_string(),
            wake_endpoints: vec![
                "/health/".to_string(),
                "/ping/".to_string(),
                "/api/games/".to_string(),
                "/api/subscriptions/tiers/".to_string(),
            ],
            api_prefix: "/api".to_string(),
            auth_scheme: "Bearer".to_string(),
            request_timeout_ms: 60_000,
            policy: WakePolicy::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.backend_base_url).map_err(|e| {
            AppError::config(format!(
                "Invalid backend_base_url {:?}: {}",
                self.backend_base_url, e
            ))
        })?;
        if self.wake_endpoints.is_empty() {
            return Err(AppError::config("wake_endpoints must not be empty"));
        }
        if self.policy.max_retries == 0 {
            return Err(AppError::config("policy.max_retries must be at least 1"));
        }
        if self.scheduler.interval_secs == 0 {
            return Err(AppError::config("scheduler.interval_secs must be positive"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Retry, timeout and cooldown settings for wake cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WakePolicy {
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub backoff_cap_ms: u64,
    /// Per-probe timeout during a wake cycle.
    pub probe_timeout_ms: u64,
    /// Timeout for the quick sleep check; shorter than `probe_timeout_ms`.
    pub sleep_check_timeout_ms: u64,
    pub cooldown_ms: u64,
    pub sleep_latency_threshold_ms: u64,
}

impl Default for WakePolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff_ms: 1_000,
            backoff_cap_ms: 10_000,
            probe_timeout_ms: 45_000,
            sleep_check_timeout_ms: 5_000,
            cooldown_ms: 30_000,
            sleep_latency_threshold_ms: 3_000,
        }
    }
}

impl WakePolicy {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn sleep_check_timeout(&self) -> Duration {
        Duration::from_millis(self.sleep_check_timeout_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn sleep_latency_threshold(&self) -> Duration {
        Duration::from_millis(self.sleep_latency_threshold_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Keep-alive period; must stay below the host's idle-sleep window.
    pub interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 14 * 60,
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
