//! Client configuration, populated from environment variables.

use std::time::Duration;

use agentstxt::limits::DEFAULT_MAX_BYTES;
use agentstxt::ParseOptions;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings for a [`DiscoveryClient`](crate::DiscoveryClient).
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `AGENTSTXT_TIMEOUT_MS` | `5000` | Bound on each request, body included |
/// | `AGENTSTXT_MAX_RESPONSE_BYTES` | `524288` | Larger responses are treated as not found |
/// | `AGENTSTXT_USER_AGENT` | `agentstxt-client/<version>` | Sent on every request |
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Applies to each request independently, from send to last body byte.
    pub timeout: Duration,

    /// Checked against `Content-Length` up front and again while streaming.
    pub max_response_bytes: usize,

    pub user_agent: String,

    /// Handed to the parser for each fetched body.
    pub parse: ParseOptions,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_response_bytes: DEFAULT_MAX_BYTES,
            user_agent: concat!("agentstxt-client/", env!("CARGO_PKG_VERSION")).to_string(),
            parse: ParseOptions::default(),
        }
    }
}

impl ClientConfig {
    /// Populate config from environment variables, applying defaults where
    /// absent or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let timeout = std::env::var("AGENTSTXT_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.timeout);

        let max_response_bytes = std::env::var("AGENTSTXT_MAX_RESPONSE_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.max_response_bytes);

        Self {
            timeout,
            max_response_bytes,
            user_agent: std::env::var("AGENTSTXT_USER_AGENT").unwrap_or(defaults.user_agent),
            parse: defaults.parse,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_response_bytes(mut self, max: usize) -> Self {
        self.max_response_bytes = max;
        self
    }
}
