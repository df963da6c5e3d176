//! API configuration.
//!
//! All values the core consumes (base URL, timeout, token lifetimes, bearer
//! header name) live here and are injected into the services that need them;
//! core logic never hard-codes them.
//!
//! Defaults can be overridden through `HAVEN_*` environment variables.

use std::time::Duration;

use chrono::Duration as ChronoDuration;

/// Default base URL for the (mock) API
const DEFAULT_BASE_URL: &str = "https://api.example.com";

/// Default request timeout in milliseconds
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Access tokens are short-lived (minutes)
const DEFAULT_ACCESS_TOKEN_TTL_MINUTES: i64 = 15;

/// Refresh tokens are long-lived (days)
const DEFAULT_REFRESH_TOKEN_TTL_DAYS: i64 = 7;

/// Header used to carry the bearer token
const DEFAULT_BEARER_HEADER: &str = "Authorization";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub access_token_ttl: ChronoDuration,
    pub refresh_token_ttl: ChronoDuration,
    pub bearer_header: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            access_token_ttl: ChronoDuration::minutes(DEFAULT_ACCESS_TOKEN_TTL_MINUTES),
            refresh_token_ttl: ChronoDuration::days(DEFAULT_REFRESH_TOKEN_TTL_DAYS),
            bearer_header: DEFAULT_BEARER_HEADER.to_string(),
        }
    }
}

impl ApiConfig {
    /// Build a config from the environment, falling back to defaults.
    ///
    /// Recognized variables: `HAVEN_BASE_URL`, `HAVEN_REQUEST_TIMEOUT_MS`,
    /// `HAVEN_ACCESS_TOKEN_TTL_MINUTES`, `HAVEN_REFRESH_TOKEN_TTL_DAYS`,
    /// `HAVEN_BEARER_HEADER`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("HAVEN_BASE_URL") {
            config.base_url = url;
        }
        if let Some(ms) = env_number("HAVEN_REQUEST_TIMEOUT_MS") {
            config.request_timeout = Duration::from_millis(ms as u64);
        }
        if let Some(minutes) = env_number("HAVEN_ACCESS_TOKEN_TTL_MINUTES") {
            config.access_token_ttl = ChronoDuration::minutes(minutes);
        }
        if let Some(days) = env_number("HAVEN_REFRESH_TOKEN_TTL_DAYS") {
            config.refresh_token_ttl = ChronoDuration::days(days);
        }
        if let Ok(header) = std::env::var("HAVEN_BEARER_HEADER") {
            config.bearer_header = header;
        }

        config
    }
}

fn env_number(name: &str) -> Option<i64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
