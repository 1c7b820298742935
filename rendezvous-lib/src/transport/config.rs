//! Configuration for the HTTP rendezvous transport.
//!
//! # Environment Variables
//!
//! [`config_from_env`] reads:
//! - `RENDEZVOUS_SERVER_URL` - base URL of the rendezvous endpoint (required)
//! - `RENDEZVOUS_TIMEOUT_SECS` - per-request timeout (optional)
//! - `RENDEZVOUS_POLL_INTERVAL_MS` - delay between unchanged polls (optional)

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable holding the rendezvous server URL.
pub const ENV_SERVER_URL: &str = "RENDEZVOUS_SERVER_URL";

/// Environment variable overriding the request timeout.
pub const ENV_TIMEOUT_SECS: &str = "RENDEZVOUS_TIMEOUT_SECS";

/// Environment variable overriding the poll interval.
pub const ENV_POLL_INTERVAL_MS: &str = "RENDEZVOUS_POLL_INTERVAL_MS";

/// Configuration for [`HttpRendezvousTransport`](super::HttpRendezvousTransport).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpTransportConfig {
    /// Endpoint new rendezvous are POSTed to
    /// (e.g. "https://rendezvous.example.org/_synapse/client/rendezvous").
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Delay between polls while the payload is unchanged, in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_timeout() -> u64 {
    30
}

fn default_poll_interval() -> u64 {
    1000
}

impl HttpTransportConfig {
    /// Create a configuration for `base_url` with default timings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: default_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, millis: u64) -> Self {
        self.poll_interval_ms = millis;
        self
    }

    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Load a configuration from environment variables.
///
/// Returns `None` if `RENDEZVOUS_SERVER_URL` is not set. Unparseable numeric
/// overrides fall back to the defaults.
pub fn config_from_env() -> Option<HttpTransportConfig> {
    let base_url = std::env::var(ENV_SERVER_URL).ok()?;
    let mut config = HttpTransportConfig::new(base_url);

    if let Some(secs) = std::env::var(ENV_TIMEOUT_SECS)
        .ok()
        .and_then(|v| v.parse().ok())
    {
        config = config.with_timeout(secs);
    }

    if let Some(millis) = std::env::var(ENV_POLL_INTERVAL_MS)
        .ok()
        .and_then(|v| v.parse().ok())
    {
        config = config.with_poll_interval(millis);
    }

    Some(config)
}
