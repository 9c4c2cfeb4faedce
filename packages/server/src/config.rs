//! Server configuration, populated from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("AGENTSTXT_BIND must be a valid socket address (e.g. 0.0.0.0:8080), got {0:?}")]
    InvalidBind(String),

    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("AGENTSTXT_MANIFEST is required (path to agents.txt or agents.json)")]
    MissingManifest,
}

/// Runtime configuration for the manifest server.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `AGENTSTXT_BIND` | `0.0.0.0:8080` | TCP socket address to listen on |
/// | `AGENTSTXT_MANIFEST` | (required) | agents.txt or agents.json to serve; `.json` selects the JSON parser |
/// | `AGENTSTXT_POLICY` | (absent) | Optional ai.txt or ai.json to serve alongside |
/// | `AGENTSTXT_CACHE_SECS` | `3600` | `max-age` in the `Cache-Control` header |
/// | `AGENTSTXT_RATE_LIMIT_PER_MINUTE` | `60` | Per-caller request cap; `0` disables |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub manifest_path: PathBuf,
    pub policy_path: Option<PathBuf>,
    pub cache_secs: u64,
    pub rate_limit_per_minute: u32,
}

impl ServerConfig {
    /// Configuration for an in-process server: no files, no rate limit.
    pub fn for_tests() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            manifest_path: PathBuf::new(),
            policy_path: None,
            cache_secs: 3600,
            rate_limit_per_minute: 0,
        }
    }

    /// Populate config from environment variables, applying defaults where absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind = std::env::var("AGENTSTXT_BIND").unwrap_or_else(|_| "0.0.0.0:8080".into());
        let bind_addr: SocketAddr = bind.parse().map_err(|_| ConfigError::InvalidBind(bind))?;

        let manifest_path = std::env::var("AGENTSTXT_MANIFEST")
            .map(PathBuf::from)
            .map_err(|_| ConfigError::MissingManifest)?;

        Ok(Self {
            bind_addr,
            manifest_path,
            policy_path: std::env::var("AGENTSTXT_POLICY").ok().map(PathBuf::from),
            cache_secs: env_number("AGENTSTXT_CACHE_SECS", 3600)?,
            rate_limit_per_minute: env_number("AGENTSTXT_RATE_LIMIT_PER_MINUTE", 60)?,
        })
    }
}

fn env_number<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
        Err(_) => Ok(default),
    }
}
