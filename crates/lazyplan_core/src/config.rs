//! Client configuration for backend access and auto-save.
//!
//! # Responsibility
//! - Provide defaults matching the web client's behaviour.
//! - Read overrides from `LAZYPLAN_*` environment variables.
//!
//! # Invariants
//! - A validated config has an http(s) base URL and a non-zero debounce.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const ENV_BASE_URL: &str = "LAZYPLAN_API_BASE_URL";
pub const ENV_TOKEN: &str = "LAZYPLAN_API_TOKEN";
pub const ENV_AUTOSAVE_DEBOUNCE_MS: &str = "LAZYPLAN_AUTOSAVE_DEBOUNCE_MS";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "LAZYPLAN_REQUEST_TIMEOUT_MS";

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api";
const DEFAULT_AUTOSAVE_DEBOUNCE_MS: u64 = 2_000;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidBaseUrl(String),
    InvalidNumber { key: &'static str, value: String },
    ZeroDebounce,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBaseUrl(value) => {
                write!(f, "base url must start with http:// or https://, got `{value}`")
            }
            Self::InvalidNumber { key, value } => {
                write!(f, "{key} must be a non-negative integer, got `{value}`")
            }
            Self::ZeroDebounce => write!(f, "auto-save debounce must be greater than zero"),
        }
    }
}

impl Error for ConfigError {}

/// Backend client and scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Prefix for every REST path, e.g. `https://host/api`.
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Quiet period before a metadata auto-save fires.
    pub autosave_debounce: Duration,
    /// Sent as bearer token when set; session cookies are always kept.
    pub auth_token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            autosave_debounce: Duration::from_millis(DEFAULT_AUTOSAVE_DEBOUNCE_MS),
            auth_token: None,
        }
    }
}

impl ClientConfig {
    /// Builds a config from process environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    ///
    /// Unset or blank keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(base_url) = read(ENV_BASE_URL) {
            config.base_url = base_url;
        }
        config.auth_token = read(ENV_TOKEN);
        if let Some(value) = read(ENV_AUTOSAVE_DEBOUNCE_MS) {
            config.autosave_debounce = parse_millis(ENV_AUTOSAVE_DEBOUNCE_MS, &value)?;
        }
        if let Some(value) = read(ENV_REQUEST_TIMEOUT_MS) {
            config.request_timeout = parse_millis(ENV_REQUEST_TIMEOUT_MS, &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks invariants that the HTTP client and scheduler rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        if self.autosave_debounce.is_zero() {
            return Err(ConfigError::ZeroDebounce);
        }
        Ok(())
    }
}

fn parse_millis(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::InvalidNumber {
            key,
            value: value.to_string(),
        })
}
