//! Per-caller sliding-window rate limiting middleware.
//!
//! Each caller key, taken from `X-Forwarded-For` → `X-Real-IP` → `"unknown"`
//! in that order, may make at most `max_per_window` requests in any trailing
//! one-minute window. Over the cap the middleware answers 429 with a
//! `Retry-After` header giving the seconds until the oldest counted request
//! leaves the window.
//!
//! A limit of `0` disables rate limiting entirely.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::task::JoinHandle;

pub const WINDOW: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// RateLimiter
// ---------------------------------------------------------------------------

/// Sliding-window per-caller rate limiter.
///
/// Keeps the timestamps of the requests counted in the current window for
/// each key. Keys whose window has emptied are dropped by [`sweep`](Self::sweep).
pub struct RateLimiter {
    state: RwLock<HashMap<String, VecDeque<Instant>>>,
    max_per_window: u32,
    window: Duration,
}

impl RateLimiter {
    /// Create a limiter allowing `max_per_minute` requests per caller.
    ///
    /// Pass `0` to disable rate limiting.
    pub fn new(max_per_minute: u32) -> Self {
        Self {
            state: RwLock::new(HashMap::new()),
            max_per_window: max_per_minute,
            window: WINDOW,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_per_window > 0
    }

    /// Returns `Ok(())` if the request is allowed, or `Err(retry_after_secs)`
    /// if `key` is over its limit.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), u64> {
        if !self.is_enabled() {
            return Ok(());
        }

        let mut state = self.state.write().unwrap_or_else(|p| p.into_inner());
        let hits = state.entry(key.to_string()).or_default();
        prune(hits, now, self.window);

        if hits.len() >= self.max_per_window as usize {
            let oldest = hits.front().copied().unwrap_or(now);
            let expires_in = self.window.saturating_sub(now.duration_since(oldest));
            // Round up: a client honouring Retry-After must not arrive early.
            let secs = expires_in.as_secs() + u64::from(expires_in.subsec_nanos() > 0);
            return Err(secs.max(1));
        }

        hits.push_back(now);
        Ok(())
    }

    /// Drop every key with no request inside the window. Returns the number
    /// of keys removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    fn sweep_at(&self, now: Instant) -> usize {
        let mut state = self.state.write().unwrap_or_else(|p| p.into_inner());
        let before = state.len();
        state.retain(|_, hits| {
            prune(hits, now, self.window);
            !hits.is_empty()
        });
        before - state.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.state.read().unwrap_or_else(|p| p.into_inner()).len()
    }
}

fn prune(hits: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while hits
        .front()
        .is_some_and(|t| now.duration_since(*t) >= window)
    {
        hits.pop_front();
    }
}

/// Run [`RateLimiter::sweep`] every `every` until the runtime shuts down.
pub fn spawn_sweeper(limiter: Arc<RateLimiter>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = limiter.sweep();
            if removed > 0 {
                tracing::debug!("rate limiter: swept {removed} idle key(s)");
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Middleware function
// ---------------------------------------------------------------------------

/// Axum `from_fn` middleware that enforces per-caller rate limiting.
pub async fn rate_limit_middleware(
    limiter: Arc<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let key = extract_ip(&req);

    match limiter.check(&key) {
        Ok(()) => next.run(req).await,
        Err(retry_after) => {
            tracing::info!("rate limit exceeded for {key}; retry in {retry_after}s");
            let mut resp = (StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded\n").into_response();
            if let Ok(v) = HeaderValue::from_str(&retry_after.to_string()) {
                resp.headers_mut().insert(header::RETRY_AFTER, v);
            }
            resp
        }
    }
}

// ---------------------------------------------------------------------------
// Caller key extraction
// ---------------------------------------------------------------------------

/// Extract the caller IP from common proxy headers, falling back to `"unknown"`.
fn extract_ip(req: &Request<Body>) -> String {
    // X-Forwarded-For: client, proxy1, proxy2. Leftmost is the client.
    if let Some(ip) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return ip.to_string();
    }

    if let Some(ip) = req
        .headers()
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return ip.to_string();
    }

    "unknown".to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
