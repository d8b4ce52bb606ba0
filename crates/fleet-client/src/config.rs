//! Client configuration from environment.

use crate::error::ConfigError;
use fleet_core::{fixed_offset, Locale};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin, e.g. `http://localhost:8082`.
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Offset applied to timestamps in formatted reports.
    pub utc_offset_minutes: i32,
    pub auth_token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8082".to_string(),
            request_timeout_secs: 30,
            utc_offset_minutes: 0,
            auth_token: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let utc_offset_minutes = match env::var("FLEET_UTC_OFFSET_MINUTES") {
            Ok(raw) => parse_utc_offset(&raw)?,
            Err(_) => defaults.utc_offset_minutes,
        };
        Ok(Self {
            base_url: env::var("FLEET_BASE_URL").unwrap_or(defaults.base_url),
            request_timeout_secs: env::var("FLEET_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
            utc_offset_minutes,
            auth_token: env::var("FLEET_AUTH_TOKEN")
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn locale(&self) -> Locale {
        Locale::default().with_utc_offset(self.utc_offset_minutes)
    }
}

/// Parse a display offset in minutes east of UTC. Anything a day or more away is refused.
pub fn parse_utc_offset(raw: &str) -> Result<i32, ConfigError> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|minutes| fixed_offset(*minutes).is_some())
        .ok_or_else(|| ConfigError::InvalidUtcOffset(raw.to_string()))
}
