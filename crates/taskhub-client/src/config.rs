//! Client configuration loaded from environment variables.

use std::time::Duration;

/// Where the API lives and how patient to be with it.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API, without a trailing slash.
    /// Env: `TASKHUB_API_URL`
    /// Default: `http://localhost:5000`
    pub base_url: String,

    /// Per-request timeout.
    /// Env: `TASKHUB_TIMEOUT_SECS`
    /// Default: 15 seconds
    pub timeout: Duration,

    /// Extra attempts for a GET that failed before reaching the service.
    /// Writes are never retried.
    /// Env: `TASKHUB_GET_RETRIES`
    /// Default: `1`
    pub get_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: format!(
                "http://localhost:{}",
                taskhub_shared::constants::DEFAULT_HTTP_PORT
            ),
            timeout: Duration::from_secs(15),
            get_retries: 1,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("TASKHUB_API_URL").filter(|u| !u.trim().is_empty()) {
            config.base_url = url.trim().trim_end_matches('/').to_string();
        }

        if let Some(val) = lookup("TASKHUB_TIMEOUT_SECS") {
            match val.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %val, "Invalid TASKHUB_TIMEOUT_SECS, using default"),
            }
        }

        if let Some(val) = lookup("TASKHUB_GET_RETRIES") {
            match val.trim().parse::<u32>() {
                Ok(n) => config.get_retries = n,
                Err(_) => tracing::warn!(value = %val, "Invalid TASKHUB_GET_RETRIES, using default"),
            }
        }

        config
    }
}
