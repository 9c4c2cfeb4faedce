//! `agentstxt-serve`: publish a manifest file over HTTP.
//!
//! # Quick start
//!
//! ```sh
//! AGENTSTXT_MANIFEST=./agents.txt agentstxt-serve
//!
//! # JSON source, with an ai.txt policy, on a custom port:
//! AGENTSTXT_MANIFEST=./agents.json AGENTSTXT_POLICY=./ai.txt \
//!     AGENTSTXT_BIND=127.0.0.1:3000 agentstxt-serve
//! ```
//!
//! # Environment variables
//!
//! See [`ServerConfig`] for the full list.

use std::process::ExitCode;
use std::sync::Arc;

use agentstxt_server::{
    build_router_with_limiter, load_manifest, load_policy, rate_limit, RateLimiter,
    ServedManifest, ServerConfig, ServerError,
};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agentstxt_server=info,tower_http=debug".into()),
        )
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let manifest = match load(&config) {
        Ok(manifest) => manifest,
        Err(e) => {
            tracing::error!("refusing to start: {e}");
            return ExitCode::FAILURE;
        }
    };

    let limiter = Arc::new(RateLimiter::new(config.rate_limit_per_minute));
    if limiter.is_enabled() {
        tracing::info!(
            "rate limit: {} request(s) per minute per caller",
            config.rate_limit_per_minute
        );
        rate_limit::spawn_sweeper(Arc::clone(&limiter), rate_limit::WINDOW);
    }

    let bind_addr = config.bind_addr;
    let app = build_router_with_limiter(manifest, config, limiter);

    let listener = match tokio::net::TcpListener::bind(bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("failed to bind {bind_addr}: {e}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("listening on {bind_addr}");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn load(config: &ServerConfig) -> Result<ServedManifest, ServerError> {
    let doc = load_manifest(&config.manifest_path)?;
    tracing::info!(
        "serving {} ({} capabilities) from {}",
        doc.site.name,
        doc.capabilities.len(),
        config.manifest_path.display()
    );
    let served = ServedManifest::from_document(&doc)?;

    match &config.policy_path {
        Some(path) => {
            let policy = load_policy(path)?;
            tracing::info!(
                "serving ai.txt (training: {}) from {}",
                policy.training.mode,
                path.display()
            );
            served.with_policy(&policy)
        }
        None => Ok(served),
    }
}
