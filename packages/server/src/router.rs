//! Assembles the Axum [`Router`] that publishes a manifest.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::{
    config::ServerConfig,
    handlers::{self, AppState},
    manifest::ServedManifest,
    rate_limit::{rate_limit_middleware, RateLimiter},
};

pub const AGENTS_TEXT_PATHS: [&str; 2] = ["/.well-known/agents.txt", "/agents.txt"];
pub const AGENTS_JSON_PATHS: [&str; 2] = ["/.well-known/agents.json", "/agents.json"];
pub const POLICY_TEXT_PATHS: [&str; 2] = ["/.well-known/ai.txt", "/ai.txt"];
pub const POLICY_JSON_PATHS: [&str; 2] = ["/.well-known/ai.json", "/ai.json"];

/// Build the router with a limiter of its own.
pub fn build_router(manifest: ServedManifest, config: ServerConfig) -> Router {
    let limiter = Arc::new(RateLimiter::new(config.rate_limit_per_minute));
    build_router_with_limiter(manifest, config, limiter)
}

/// Build the router around an existing limiter, so the caller can run
/// [`spawn_sweeper`](crate::rate_limit::spawn_sweeper) against it.
pub fn build_router_with_limiter(
    manifest: ServedManifest,
    config: ServerConfig,
    limiter: Arc<RateLimiter>,
) -> Router {
    let has_policy = manifest.policy.is_some();
    let state = AppState::new(manifest, config.cache_secs);

    let mut router = Router::new();
    for path in AGENTS_TEXT_PATHS {
        router = router.route(path, get(handlers::agents_text));
    }
    for path in AGENTS_JSON_PATHS {
        router = router.route(path, get(handlers::agents_json));
    }
    if has_policy {
        for path in POLICY_TEXT_PATHS {
            router = router.route(path, get(handlers::policy_text));
        }
        for path in POLICY_JSON_PATHS {
            router = router.route(path, get(handlers::policy_json));
        }
    }

    router
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(move |req, next| {
            rate_limit_middleware(Arc::clone(&limiter), req, next)
        }))
}
