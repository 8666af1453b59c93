//! Event loop configuration.
//!
//! Holds the server address and the loop timings. Use the builder methods
//! to customize:
//!
//! ```ignore
//! use std::time::Duration;
//! use opencode_events::config::{BaseUrl, EventLoopConfig};
//!
//! let base = BaseUrl::parse("http://192.168.1.20:4096/")?;
//! assert_eq!(base.event_url(), "http://192.168.1.20:4096/event");
//!
//! let config = EventLoopConfig::default()
//!     .with_end_delay(Duration::from_secs(1))
//!     .with_error_delay(Duration::from_secs(10));
//! ```

use std::fmt;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

/// Environment variable holding the server address for the CLI.
pub const ENV_SERVER_URL: &str = "OPENCODE_URL";
/// Environment override for the delay after a clean stream end.
pub const ENV_END_DELAY_MS: &str = "OPENCODE_EVENT_END_DELAY_MS";
/// Environment override for the delay after a transport error.
pub const ENV_ERROR_DELAY_MS: &str = "OPENCODE_EVENT_ERROR_DELAY_MS";
/// Environment override for the connection establishment limit.
pub const ENV_CONNECT_TIMEOUT_MS: &str = "OPENCODE_EVENT_CONNECT_TIMEOUT_MS";

/// Default pause before reconnecting after the server ended the stream.
pub const DEFAULT_END_DELAY: Duration = Duration::from_secs(3);
/// Default pause before reconnecting after a transport error.
pub const DEFAULT_ERROR_DELAY: Duration = Duration::from_secs(5);

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Invalid server URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unsupported URL scheme '{0}', expected http or https")]
    UnsupportedScheme(String),

    #[error("Invalid value for {name}: '{value}' is not a number of milliseconds")]
    InvalidDelay { name: String, value: String },
}

/// A validated opencode server address.
///
/// Only `http` and `https` are accepted. Trailing slashes are dropped so that
/// endpoint paths can be appended directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl(String);

impl BaseUrl {
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let trimmed = input.trim();
        let url = Url::parse(trimmed).map_err(|e| ConfigError::InvalidUrl {
            url: trimmed.to_string(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        }

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl {
                url: trimmed.to_string(),
                reason: "missing host".to_string(),
            });
        }

        Ok(Self(trimmed.trim_end_matches('/').to_string()))
    }

    /// Returns true if `input` would be accepted by [`BaseUrl::parse`].
    pub fn is_valid(input: &str) -> bool {
        Self::parse(input).is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The server-sent events endpoint
    pub fn event_url(&self) -> String {
        format!("{}/event", self.0)
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BaseUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Timing configuration for the reconnecting event loop.
#[derive(Debug, Clone, PartialEq)]
pub struct EventLoopConfig {
    /// Pause before reopening after the server ended the stream cleanly
    pub end_delay: Duration,
    /// Pause before reopening after a transport error
    pub error_delay: Duration,
    /// Limit on establishing the connection. The stream itself is
    /// long-lived and never times out.
    pub connect_timeout: Option<Duration>,
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        Self {
            end_delay: DEFAULT_END_DELAY,
            error_delay: DEFAULT_ERROR_DELAY,
            connect_timeout: None,
        }
    }
}

impl EventLoopConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_end_delay(mut self, delay: Duration) -> Self {
        self.end_delay = delay;
        self
    }

    pub fn with_error_delay(mut self, delay: Duration) -> Self {
        self.error_delay = delay;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Defaults overridden by `OPENCODE_EVENT_END_DELAY_MS`,
    /// `OPENCODE_EVENT_ERROR_DELAY_MS` and `OPENCODE_EVENT_CONNECT_TIMEOUT_MS`
    /// when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(delay) = read_delay(&lookup, ENV_END_DELAY_MS)? {
            config.end_delay = delay;
        }
        if let Some(delay) = read_delay(&lookup, ENV_ERROR_DELAY_MS)? {
            config.error_delay = delay;
        }
        if let Some(timeout) = read_delay(&lookup, ENV_CONNECT_TIMEOUT_MS)? {
            config.connect_timeout = Some(timeout);
        }
        Ok(config)
    }
}

fn read_delay<F>(lookup: &F, name: &str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(|ms| Some(Duration::from_millis(ms)))
        .map_err(|_| ConfigError::InvalidDelay {
            name: name.to_string(),
            value: raw,
        })
}
