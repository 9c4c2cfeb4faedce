//! End-to-end discovery tests.
//!
//! Each test spawns one or more in-process origins (real TCP, real HTTP) via
//! [`agentstxt_conformance::spawn_origin`] and points a `DiscoveryClient` at
//! them. Origins built from hand-written axum routers model the failure
//! cases; [`agentstxt_conformance::spawn_manifest_server`] runs the real
//! serving router.
//!
//! # Coverage
//!
//! | Test | Behaviour |
//! |------|-----------|
//! | `discover_text_from_manifest_server` | text discovery, happy path |
//! | `discover_json_from_manifest_server` | JSON discovery, happy path |
//! | `well_known_path_wins` | well-known tried before root |
//! | `falls_back_to_root_path` | 404 on well-known → root |
//! | `base_path_prefix_is_kept` | paths resolved under `/tenant/` |
//! | `server_error_falls_through` | 5xx on well-known → root |
//! | `discover_any_prefers_json` | JSON before text |
//! | `discover_any_falls_back_to_text` | no JSON → text |
//! | `timeout_falls_through` | hanging well-known → root, bounded |
//! | `declared_oversize_falls_through` | `Content-Length` over limit |
//! | `streamed_oversize_falls_through` | chunked body over limit |
//! | `broken_manifest_is_returned_not_skipped` | parse errors are not a miss |
//! | `nothing_found_names_every_attempt` | `DISCOVERY_FAILED` message |
//! | `invalid_base_url_fails_before_io` | precondition errors |
//! | `server_paths_serve_identical_bodies` | serving router headers/bodies |
//! | `server_rate_limit_returns_429` | 429 + `Retry-After` |
//! | `discover_policy_from_manifest_server` | ai.txt discovery |
//! | `served_manifest_survives_round_trip` | served bytes re-parse to the source |

use std::time::{Duration, Instant};

use agentstxt::{IssueCode, PolicyDocument, Site, TrainingMode, TrainingPolicy};
use agentstxt_client::{ClientConfig, ClientError, DiscoveryClient};
use agentstxt_conformance::{
    chunked, manifest_named, sample_document, slow, spawn_manifest_server, spawn_origin, status,
    text, SAMPLE_MANIFEST,
};
use agentstxt_server::{ServedManifest, ServerConfig};
use axum::{http::StatusCode, routing::get, Router};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_client() -> DiscoveryClient {
    DiscoveryClient::new(ClientConfig::default().with_timeout(Duration::from_secs(5))).unwrap()
}

fn served() -> ServedManifest {
    ServedManifest::from_document(&sample_document()).unwrap()
}

fn make_http() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

// ---------------------------------------------------------------------------
// Happy paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn discover_text_from_manifest_server() {
    let base = spawn_manifest_server(served(), ServerConfig::for_tests()).await;

    let result = make_client().discover(&base).await.unwrap();
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    let doc = result.document.unwrap();
    assert_eq!(doc.site.name, "Conformance Shop");
    let ids: Vec<_> = doc.capabilities.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["product-search", "checkout"]);
}

#[tokio::test]
async fn discover_json_from_manifest_server() {
    let base = spawn_manifest_server(served(), ServerConfig::for_tests()).await;

    let result = make_client().discover_json(&base).await.unwrap();
    let doc = result.document.unwrap();
    assert_eq!(doc.capabilities.len(), 2);
    assert_eq!(doc.capabilities[0].params[0].name, "q");
}

#[tokio::test]
async fn served_manifest_survives_round_trip() {
    let source = sample_document();
    let base = spawn_manifest_server(served(), ServerConfig::for_tests()).await;

    let from_text = make_client().discover(&base).await.unwrap().document.unwrap();
    let from_json = make_client()
        .discover_json(&base)
        .await
        .unwrap()
        .document
        .unwrap();
    assert_eq!(from_text.capabilities, source.capabilities);
    assert_eq!(from_json.capabilities, source.capabilities);
    assert_eq!(from_text.agents, from_json.agents);
}

// ---------------------------------------------------------------------------
// Path order and fallback
// ---------------------------------------------------------------------------

#[tokio::test]
async fn well_known_path_wins() {
    let router = Router::new()
        .route(
            "/.well-known/agents.txt",
            get(|| async { text(manifest_named("Well Known")) }),
        )
        .route("/agents.txt", get(|| async { text(manifest_named("Root")) }));
    let base = spawn_origin(router).await;

    let doc = make_client().discover(&base).await.unwrap().document.unwrap();
    assert_eq!(doc.site.name, "Well Known");
}

#[tokio::test]
async fn falls_back_to_root_path() {
    let router = Router::new().route("/agents.txt", get(|| async { text(SAMPLE_MANIFEST) }));
    let base = spawn_origin(router).await;

    let result = make_client().discover(&base).await.unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn base_path_prefix_is_kept() {
    let router = Router::new()
        .route(
            "/tenant/.well-known/agents.txt",
            get(|| async { text(manifest_named("Tenant")) }),
        )
        .route(
            "/.well-known/agents.txt",
            get(|| async { text(manifest_named("Origin Root")) }),
        );
    let base = spawn_origin(router).await;

    for base in [format!("{base}/tenant/"), format!("{base}/tenant")] {
        let doc = make_client().discover(&base).await.unwrap().document.unwrap();
        assert_eq!(doc.site.name, "Tenant");
    }
}

#[tokio::test]
async fn server_error_falls_through() {
    let router = Router::new()
        .route(
            "/.well-known/agents.txt",
            get(|| async { status(StatusCode::INTERNAL_SERVER_ERROR) }),
        )
        .route("/agents.txt", get(|| async { text(manifest_named("Root")) }));
    let base = spawn_origin(router).await;

    let doc = make_client().discover(&base).await.unwrap().document.unwrap();
    assert_eq!(doc.site.name, "Root");
}

#[tokio::test]
async fn discover_any_prefers_json() {
    let json = agentstxt::generate_json(&sample_document())
        .unwrap()
        .replace("Conformance Shop", "From JSON");
    let router = Router::new()
        .route(
            "/.well-known/agents.txt",
            get(|| async { text(manifest_named("From Text")) }),
        )
        .route("/agents.json", get(move || async move { text(json) }));
    let base = spawn_origin(router).await;

    let doc = make_client().discover_any(&base).await.unwrap().document.unwrap();
    assert_eq!(doc.site.name, "From JSON");
}

#[tokio::test]
async fn discover_any_falls_back_to_text() {
    let router = Router::new().route(
        "/.well-known/agents.txt",
        get(|| async { text(manifest_named("From Text")) }),
    );
    let base = spawn_origin(router).await;

    let doc = make_client().discover_any(&base).await.unwrap().document.unwrap();
    assert_eq!(doc.site.name, "From Text");
}

// ---------------------------------------------------------------------------
// Resource bounds
// ---------------------------------------------------------------------------

#[tokio::test]
async fn timeout_falls_through() {
    let router = Router::new()
        .route(
            "/.well-known/agents.txt",
            get(|| slow(Duration::from_secs(30), manifest_named("Too Late"))),
        )
        .route("/agents.txt", get(|| async { text(manifest_named("Root")) }));
    let base = spawn_origin(router).await;

    let client =
        DiscoveryClient::new(ClientConfig::default().with_timeout(Duration::from_millis(300)))
            .unwrap();
    let started = Instant::now();
    let doc = client.discover(&base).await.unwrap().document.unwrap();

    assert_eq!(doc.site.name, "Root");
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "hanging path must be abandoned at the timeout"
    );
}

#[tokio::test]
async fn declared_oversize_falls_through() {
    let router = Router::new()
        .route(
            "/.well-known/agents.txt",
            get(|| async { text(format!("{SAMPLE_MANIFEST}#{}\n", "x".repeat(4096))) }),
        )
        .route("/agents.txt", get(|| async { text(manifest_named("Small")) }));
    let base = spawn_origin(router).await;

    let client =
        DiscoveryClient::new(ClientConfig::default().with_max_response_bytes(2048)).unwrap();
    let doc = client.discover(&base).await.unwrap().document.unwrap();
    assert_eq!(doc.site.name, "Small");
}

#[tokio::test]
async fn streamed_oversize_falls_through() {
    let router = Router::new()
        .route("/.well-known/agents.txt", get(|| async { chunked(512, 16) }))
        .route("/agents.txt", get(|| async { text(manifest_named("Small")) }));
    let base = spawn_origin(router).await;

    let client =
        DiscoveryClient::new(ClientConfig::default().with_max_response_bytes(2048)).unwrap();
    let doc = client.discover(&base).await.unwrap().document.unwrap();
    assert_eq!(doc.site.name, "Small");
}

// ---------------------------------------------------------------------------
// Failure reporting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn broken_manifest_is_returned_not_skipped() {
    let router = Router::new()
        .route(
            "/.well-known/agents.txt",
            get(|| async { text("Site-URL: https://shop.example.com\n") }),
        )
        .route("/agents.txt", get(|| async { text(SAMPLE_MANIFEST) }));
    let base = spawn_origin(router).await;

    let result = make_client().discover(&base).await.unwrap();
    assert!(result.document.is_none());
    assert!(result
        .errors
        .iter()
        .any(|e| e.code == IssueCode::MissingField));
}

#[tokio::test]
async fn nothing_found_names_every_attempt() {
    let base = spawn_origin(Router::new()).await;

    let result = make_client().discover(&base).await.unwrap();
    assert!(result.document.is_none());
    assert_eq!(result.errors.len(), 1);
    let error = &result.errors[0];
    assert_eq!(error.code, IssueCode::DiscoveryFailed);
    assert!(error.message.contains(&format!("{base}/.well-known/agents.txt")));
    assert!(error.message.contains(&format!("{base}/agents.txt")));
    assert!(error.message.contains("404"));
}

#[tokio::test]
async fn invalid_base_url_fails_before_io() {
    let client = make_client();
    assert!(matches!(
        client.discover("shop.example.com").await,
        Err(ClientError::InvalidUrl { .. })
    ));
    assert!(matches!(
        client.discover_json("file:///etc/agents.json").await,
        Err(ClientError::UnsupportedScheme(_))
    ));
}

// ---------------------------------------------------------------------------
// Serving router over real TCP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn server_paths_serve_identical_bodies() {
    let base = spawn_manifest_server(served(), ServerConfig::for_tests()).await;
    let http = make_http();

    for (paths, content_type) in [
        (["/.well-known/agents.txt", "/agents.txt"], "text/plain; charset=utf-8"),
        (["/.well-known/agents.json", "/agents.json"], "application/json"),
    ] {
        let mut bodies = Vec::new();
        for path in paths {
            let resp = http.get(format!("{base}{path}")).send().await.unwrap();
            assert_eq!(resp.status(), 200);
            assert_eq!(resp.headers()["content-type"], content_type);
            assert_eq!(resp.headers()["access-control-allow-origin"], "*");
            assert!(resp.headers()["cache-control"]
                .to_str()
                .unwrap()
                .starts_with("public, max-age="));
            bodies.push(resp.text().await.unwrap());
        }
        assert_eq!(bodies[0], bodies[1]);
    }
}

#[tokio::test]
async fn server_rate_limit_returns_429() {
    let config = ServerConfig {
        rate_limit_per_minute: 1,
        ..ServerConfig::for_tests()
    };
    let base = spawn_manifest_server(served(), config).await;
    let http = make_http();

    let first = http.get(format!("{base}/agents.txt")).send().await.unwrap();
    assert_eq!(first.status(), 200);

    let second = http.get(format!("{base}/agents.txt")).send().await.unwrap();
    assert_eq!(second.status(), 429);
    let retry: u64 = second.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry));

    // A different caller key has its own window.
    let other = http
        .get(format!("{base}/agents.txt"))
        .header("x-forwarded-for", "203.0.113.7")
        .send()
        .await
        .unwrap();
    assert_eq!(other.status(), 200);
}

#[tokio::test]
async fn discover_policy_from_manifest_server() {
    let mut policy = PolicyDocument::new(Site::new("Conformance Shop", "https://shop.example.com"));
    policy.training = TrainingPolicy {
        mode: TrainingMode::Conditional,
        allow: vec!["/blog/*".into()],
        deny: vec!["/account/*".into()],
    };
    let manifest = served().with_policy(&policy).unwrap();
    let base = spawn_manifest_server(manifest, ServerConfig::for_tests()).await;

    let result = make_client().discover_policy(&base).await.unwrap();
    let fetched = result.document.unwrap();
    assert_eq!(fetched.training, policy.training);
    assert_eq!(fetched.training_for("AnyBot"), TrainingMode::Conditional);
}
