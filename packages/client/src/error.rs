//! Client error types.
//!
//! [`ClientError`] covers caller mistakes detected before any network I/O.
//! A manifest that cannot be fetched is not an error: it comes back as a
//! `ParseResult` carrying a single `DISCOVERY_FAILED` diagnostic.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid base URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported URL scheme {0:?}; expected http or https")]
    UnsupportedScheme(String),

    #[error("could not build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Why one fetch attempt did not produce a body.
#[derive(Debug, Error)]
pub(crate) enum FetchError {
    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("request failed: {0}")]
    Transport(reqwest::Error),

    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("response exceeds {max} bytes")]
    TooLarge { max: usize },

    #[error("response body is not valid UTF-8")]
    NotUtf8,

    #[error("{0}")]
    Input(#[from] agentstxt::InputError),
}
