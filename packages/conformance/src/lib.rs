//! Shared helpers for the agents.txt conformance suite.
//!
//! [`spawn_origin`] binds a `TcpListener` on an ephemeral port and serves
//! any axum [`Router`] from it, so tests can stand up origins that misbehave
//! in specific ways. [`spawn_manifest_server`] does the same with the real
//! `agentstxt-server` router.

use std::time::Duration;

use agentstxt::{parse_text, Document, ParseOptions};
use agentstxt_server::{build_router, ServedManifest, ServerConfig};
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Router,
};

/// A small but complete manifest: two capabilities, one agent policy.
pub const SAMPLE_MANIFEST: &str = "\
# agents.txt
Spec-Version: 1.0
Site-Name: Conformance Shop
Site-URL: https://shop.example.com
Description: In-process origin for discovery tests

Capability: product-search
  Endpoint: https://shop.example.com/api/search
  Method: GET
  Protocol: REST
  Auth: api-key
  Rate-Limit: 60/minute
  Param: q (query, string, required)

Capability: checkout
  Endpoint: https://shop.example.com/api/checkout
  Method: POST
  Protocol: REST
  Auth: oauth2

Agent: *
  Capabilities: *
";

/// [`SAMPLE_MANIFEST`] with its site name replaced, for telling two origins'
/// answers apart.
pub fn manifest_named(name: &str) -> String {
    SAMPLE_MANIFEST.replace("Conformance Shop", name)
}

/// Parse [`SAMPLE_MANIFEST`].
///
/// # Panics
///
/// Panics if the fixture does not parse, which would be a bug in the parser.
pub fn sample_document() -> Document {
    parse_text(SAMPLE_MANIFEST, &ParseOptions::default())
        .expect("fixture within size limit")
        .document
        .expect("fixture parses")
}

/// Serve `router` on an ephemeral port and return its base URL, e.g.
/// `http://127.0.0.1:51234`.
///
/// # Panics
///
/// Panics if the TCP listener cannot be bound.
pub async fn spawn_origin(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("get local addr");

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("conformance origin error");
    });

    format!("http://{addr}")
}

/// Serve `doc` (and optionally `manifest.policy`) through the real server
/// router. Returns the base URL.
pub async fn spawn_manifest_server(manifest: ServedManifest, config: ServerConfig) -> String {
    spawn_origin(build_router(manifest, config)).await
}

// ---------------------------------------------------------------------------
// Misbehaving handlers
// ---------------------------------------------------------------------------

/// A 200 text response with an explicit `Content-Length`.
pub fn text(body: impl Into<String>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body.into(),
    )
        .into_response()
}

/// A 200 response streamed in `chunks` pieces of `chunk_size` bytes with no
/// `Content-Length`, so only a streaming size check can catch it.
pub fn chunked(chunk_size: usize, chunks: usize) -> Response {
    let pieces = (0..chunks).map(move |_| Ok::<_, std::io::Error>("#".repeat(chunk_size)));
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(tokio_stream::iter(pieces)),
    )
        .into_response()
}

/// Wait `delay` before answering.
pub async fn slow(delay: Duration, body: String) -> Response {
    tokio::time::sleep(delay).await;
    text(body)
}

pub fn status(code: StatusCode) -> Response {
    code.into_response()
}
