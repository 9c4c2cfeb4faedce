//! Manifest handlers. Every route returns a pre-rendered body.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};

use crate::manifest::{Rendered, ServedManifest};

pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub manifest: Arc<ServedManifest>,
    pub cache_control: HeaderValue,
}

impl AppState {
    pub fn new(manifest: ServedManifest, cache_secs: u64) -> Self {
        Self {
            manifest: Arc::new(manifest),
            cache_control: cache_control(cache_secs),
        }
    }

    fn respond(&self, content_type: &'static str, body: &str) -> Response {
        (
            [
                (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
                (header::CACHE_CONTROL, self.cache_control.clone()),
                (
                    header::ACCESS_CONTROL_ALLOW_ORIGIN,
                    HeaderValue::from_static("*"),
                ),
            ],
            body.to_owned(),
        )
            .into_response()
    }

    fn policy(&self) -> Option<&Rendered> {
        self.manifest.policy.as_ref()
    }
}

fn cache_control(secs: u64) -> HeaderValue {
    // Digits and ASCII only, so the fallback is unreachable in practice.
    HeaderValue::from_str(&format!("public, max-age={secs}"))
        .unwrap_or_else(|_| HeaderValue::from_static("public"))
}

/// `GET /.well-known/agents.txt` and `GET /agents.txt`
pub async fn agents_text(State(state): State<AppState>) -> Response {
    state.respond(TEXT_CONTENT_TYPE, &state.manifest.agents.text)
}

/// `GET /.well-known/agents.json` and `GET /agents.json`
pub async fn agents_json(State(state): State<AppState>) -> Response {
    state.respond(JSON_CONTENT_TYPE, &state.manifest.agents.json)
}

/// `GET /.well-known/ai.txt` and `GET /ai.txt`
///
/// Only routed when a policy is loaded; the 404 arm covers a state built
/// by hand without one.
pub async fn policy_text(State(state): State<AppState>) -> Response {
    match state.policy() {
        Some(p) => state.respond(TEXT_CONTENT_TYPE, &p.text),
        None => axum::http::StatusCode::NOT_FOUND.into_response(),
    }
}

/// `GET /.well-known/ai.json` and `GET /ai.json`
pub async fn policy_json(State(state): State<AppState>) -> Response {
    match state.policy() {
        Some(p) => state.respond(JSON_CONTENT_TYPE, &p.json),
        None => axum::http::StatusCode::NOT_FOUND.into_response(),
    }
}
