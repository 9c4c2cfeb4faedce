//! Manifest discovery over HTTP.
//!
//! Each `discover*` call tries a fixed list of paths on the origin, in
//! order, and stops at the first one that returns a body:
//!
//! | Call | Paths |
//! |------|-------|
//! | [`DiscoveryClient::discover`] | `/.well-known/agents.txt`, `/agents.txt` |
//! | [`DiscoveryClient::discover_json`] | `/.well-known/agents.json`, `/agents.json` |
//! | [`DiscoveryClient::discover_any`] | the JSON paths, then the text paths |
//! | [`DiscoveryClient::discover_policy`] | `/.well-known/ai.txt`, `/ai.txt` |
//!
//! Paths are resolved under the base URL's path, so an origin published at
//! `https://host/tenant/` is looked up at `https://host/tenant/agents.txt`.
//!
//! An attempt falls through to the next path on a non-2xx status, a
//! transport error, a timeout, or a body over the size limit. Attempts are
//! sequential. When every path falls through, the result is a failed
//! `ParseResult` with one `DISCOVERY_FAILED` error naming each URL tried.
//!
//! Once a body is fetched, the parser's result is returned as-is, errors
//! included: a manifest that exists but is broken is not "not found".

use agentstxt::{
    parse_json, parse_policy, parse_text, Diagnostic, Document, InputError, IssueCode,
    ParseOptions, ParseResult, PolicyDocument,
};
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ClientError, FetchError};

pub const TEXT_PATHS: [&str; 2] = ["/.well-known/agents.txt", "/agents.txt"];
pub const JSON_PATHS: [&str; 2] = ["/.well-known/agents.json", "/agents.json"];
pub const POLICY_PATHS: [&str; 2] = ["/.well-known/ai.txt", "/ai.txt"];

type Parser<T> = fn(&str, &ParseOptions) -> Result<ParseResult<T>, InputError>;

// ---------------------------------------------------------------------------
// DiscoveryClient
// ---------------------------------------------------------------------------

/// Fetches and parses manifests from remote origins.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct DiscoveryClient {
    http: Client,
    config: ClientConfig,
}

impl DiscoveryClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = Client::builder().user_agent(&config.user_agent).build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Discover the text manifest (agents.txt).
    pub async fn discover(&self, base: &str) -> Result<ParseResult<Document>, ClientError> {
        let base = base_url(base)?;
        let mut failures = Vec::new();
        Ok(self
            .try_paths(&base, &TEXT_PATHS, parse_text, &mut failures)
            .await
            .unwrap_or_else(|| not_found(&base, &failures)))
    }

    /// Discover the JSON manifest (agents.json).
    pub async fn discover_json(&self, base: &str) -> Result<ParseResult<Document>, ClientError> {
        let base = base_url(base)?;
        let mut failures = Vec::new();
        Ok(self
            .try_paths(&base, &JSON_PATHS, parse_json, &mut failures)
            .await
            .unwrap_or_else(|| not_found(&base, &failures)))
    }

    /// Discover either form, preferring JSON. The text paths are only tried
    /// when neither JSON path yields a body.
    pub async fn discover_any(&self, base: &str) -> Result<ParseResult<Document>, ClientError> {
        let base = base_url(base)?;
        let mut failures = Vec::new();
        if let Some(result) = self
            .try_paths(&base, &JSON_PATHS, parse_json, &mut failures)
            .await
        {
            return Ok(result);
        }
        Ok(self
            .try_paths(&base, &TEXT_PATHS, parse_text, &mut failures)
            .await
            .unwrap_or_else(|| not_found(&base, &failures)))
    }

    /// Discover the ai.txt training policy.
    pub async fn discover_policy(
        &self,
        base: &str,
    ) -> Result<ParseResult<PolicyDocument>, ClientError> {
        let base = base_url(base)?;
        let mut failures = Vec::new();
        Ok(self
            .try_paths(&base, &POLICY_PATHS, parse_policy, &mut failures)
            .await
            .unwrap_or_else(|| not_found(&base, &failures)))
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    /// Try each path in turn. Returns the parse result for the first body
    /// fetched, or `None` after recording why every attempt failed.
    async fn try_paths<T>(
        &self,
        base: &Url,
        paths: &[&str],
        parse: Parser<T>,
        failures: &mut Vec<String>,
    ) -> Option<ParseResult<T>> {
        for path in paths {
            let url = manifest_url(base, path);
            debug!("discovery: GET {url}");
            let outcome = match self.fetch(&url).await {
                Ok(body) => parse(&body, &self.config.parse).map_err(FetchError::from),
                Err(e) => Err(e),
            };
            match outcome {
                Ok(result) => {
                    info!(
                        "discovery: fetched {url} ({} error(s), {} warning(s))",
                        result.errors.len(),
                        result.warnings.len()
                    );
                    return Some(result);
                }
                Err(e) => {
                    warn!("discovery: {url} failed: {e}");
                    failures.push(format!("{url}: {e}"));
                }
            }
        }
        None
    }

    /// GET `url` and read the body, bounded by the configured timeout and
    /// size limit. Dropping the future on timeout aborts the connection.
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        tokio::time::timeout(self.config.timeout, self.fetch_body(url))
            .await
            .map_err(|_| FetchError::Timeout(self.config.timeout))?
    }

    async fn fetch_body(&self, url: &Url) -> Result<String, FetchError> {
        let max = self.config.max_response_bytes;
        let mut response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(FetchError::Transport)?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }
        if response.content_length().is_some_and(|len| len > max as u64) {
            return Err(FetchError::TooLarge { max });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(FetchError::Transport)? {
            if body.len() + chunk.len() > max {
                return Err(FetchError::TooLarge { max });
            }
            body.extend_from_slice(&chunk);
        }
        String::from_utf8(body).map_err(|_| FetchError::NotUtf8)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Validate a caller-supplied origin before any I/O.
fn base_url(base: &str) -> Result<Url, ClientError> {
    let url = Url::parse(base).map_err(|e| ClientError::InvalidUrl {
        url: base.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::UnsupportedScheme(url.scheme().to_string()));
    }
    if !url.has_host() {
        return Err(ClientError::InvalidUrl {
            url: base.to_string(),
            reason: "URL has no host".into(),
        });
    }
    Ok(url)
}

/// `path` appended under the base path, trailing slashes stripped first:
/// `https://host/tenant/` + `/agents.txt` → `https://host/tenant/agents.txt`.
/// Query and fragment are dropped.
fn manifest_url(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    let prefix = base.path().trim_end_matches('/');
    url.set_path(&format!("{prefix}{path}"));
    url
}

fn not_found<T>(base: &Url, failures: &[String]) -> ParseResult<T> {
    ParseResult::failure(Diagnostic::new(
        IssueCode::DiscoveryFailed,
        format!(
            "no manifest found for {}: {}",
            base.origin().ascii_serialization(),
            failures.join("; ")
        ),
    ))
}
