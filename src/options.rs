use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{HttpError, Result};

/// Timeouts at or below this many milliseconds are not enforced.
pub const MIN_ENFORCED_TIMEOUT_MS: u64 = 100;

/// Configures timeout, retry, redirect and proxy behavior.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestOptions {
    /// Per-attempt timeout in milliseconds. Only enforced above
    /// [`MIN_ENFORCED_TIMEOUT_MS`].
    pub timeout_ms: u64,
    /// Number of attempts. `0` still performs one attempt.
    pub retry_attempts: u32,
    /// Delay between attempts in milliseconds, raised to the retry floor.
    pub retry_delay_ms: u64,
    /// Whether redirects are followed by the transport.
    pub follow_redirects: bool,
    /// Outbound proxy URL. Empty disables the proxy.
    pub proxy: String,
}

impl RequestOptions {
    /// Reads options from environment variables.
    ///
    /// Reads:
    /// - `FLUENT_REQUEST_TIMEOUT_MS`
    /// - `FLUENT_REQUEST_RETRY_ATTEMPTS`
    /// - `FLUENT_REQUEST_RETRY_DELAY_MS`
    /// - `FLUENT_REQUEST_FOLLOW_REDIRECTS` (`true`/`false`/`1`/`0`)
    /// - `FLUENT_REQUEST_PROXY`
    ///
    /// Unset variables keep their default. A variable that is set but does
    /// not parse returns [`HttpError::Config`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = Self::default();
        if let Some(value) = lookup("FLUENT_REQUEST_TIMEOUT_MS") {
            opts.timeout_ms = parse_var("FLUENT_REQUEST_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("FLUENT_REQUEST_RETRY_ATTEMPTS") {
            opts.retry_attempts = parse_var("FLUENT_REQUEST_RETRY_ATTEMPTS", &value)?;
        }
        if let Some(value) = lookup("FLUENT_REQUEST_RETRY_DELAY_MS") {
            opts.retry_delay_ms = parse_var("FLUENT_REQUEST_RETRY_DELAY_MS", &value)?;
        }
        if let Some(value) = lookup("FLUENT_REQUEST_FOLLOW_REDIRECTS") {
            opts.follow_redirects = match value.trim() {
                "1" => true,
                "0" => false,
                other => parse_var("FLUENT_REQUEST_FOLLOW_REDIRECTS", other)?,
            };
        }
        if let Some(value) = lookup("FLUENT_REQUEST_PROXY") {
            opts.proxy = value.trim().to_owned();
        }
        Ok(opts)
    }

    /// Timeout handed to the transport, if one is enforced.
    pub fn effective_timeout(&self) -> Option<Duration> {
        (self.timeout_ms > MIN_ENFORCED_TIMEOUT_MS).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Proxy handed to the transport, if one is configured.
    pub fn effective_proxy(&self) -> Option<&str> {
        (!self.proxy.is_empty()).then_some(self.proxy.as_str())
    }

    /// Number of attempts the executor makes.
    pub fn max_attempts(&self) -> u32 {
        self.retry_attempts.max(1)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| HttpError::Config(format!("{key} has invalid value '{value}'")))
}
