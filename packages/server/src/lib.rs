//! Publishes an agents.txt manifest (and optionally an ai.txt policy) at
//! the well-known paths.
//!
//! Exposes the router builder and config types so that external crates
//! (e.g. the conformance suite) can run an in-process origin without
//! spawning a subprocess.

pub mod config;
pub mod error;
pub mod handlers;
pub mod manifest;
pub mod rate_limit;
pub mod router;

pub use config::ServerConfig;
pub use error::ServerError;
pub use manifest::{load_manifest, load_policy, ServedManifest};
pub use rate_limit::RateLimiter;
pub use router::{build_router, build_router_with_limiter};
