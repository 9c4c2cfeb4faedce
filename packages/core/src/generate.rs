//! Text rendering of a [`Document`] as agents.txt.
//!
//! The output is the canonical text form: fixed field order, two-space
//! indentation inside blocks, a trailing newline. Every value is passed
//! through [`sanitize_value`] so that no input can smuggle a line break
//! into the output and forge an extra directive.
//!
//! ```text
//! # agents.txt
//! # Generated: 2026-03-01T12:00:00Z
//! Spec-Version: 1.0
//! Site-Name: Example Shop
//! Site-URL: https://shop.example.com
//!
//! Capability: product-search
//!   Description: Search the catalogue
//!   Endpoint: https://shop.example.com/api/search
//!   Protocol: REST
//!   Rate-Limit: 100/minute
//!   Param: q (query, string, required) — Search terms
//!
//! Agent: *
//!   Rate-Limit: 10/minute
//! ```

use crate::grammar::{format_param, sanitize_key, sanitize_value, MAX_FIELD_LEN};
use crate::types::{AgentPolicy, Capability, Document};

/// Top-level keys with a fixed meaning. A metadata entry whose key
/// collides with one of these is not emitted.
pub(crate) const RESERVED_KEYS: &[&str] = &[
    "spec-version",
    "site-name",
    "site-url",
    "site-description",
    "description",
    "contact",
    "privacy-policy",
    "allow",
    "disallow",
    "capability",
    "agent",
];

/// Render `doc` as agents.txt.
pub fn generate_text(doc: &Document) -> String {
    let mut out = Out::default();

    out.comment("agents.txt");
    if let Some(ts) = &doc.generated_at {
        out.comment(&format!("Generated: {}", token(ts)));
    }
    out.field("Spec-Version", &token(&doc.spec_version));
    out.field("Site-Name", &text(&doc.site.name));
    out.field("Site-URL", &token(&doc.site.url));
    if let Some(description) = &doc.site.description {
        out.field("Description", &text(description));
    }
    if let Some(contact) = &doc.site.contact {
        out.field("Contact", &text(contact));
    }
    if let Some(privacy) = &doc.site.privacy_policy {
        out.field("Privacy-Policy", &token(privacy));
    }

    for cap in &doc.capabilities {
        out.blank();
        capability_block(&mut out, cap);
    }

    if !doc.access.is_default() {
        out.blank();
        let emit_allow = !(doc.access.allow.len() == 1 && doc.access.allow[0] == "*");
        if emit_allow {
            for pattern in &doc.access.allow {
                out.field("Allow", &token(pattern));
            }
        }
        for pattern in &doc.access.disallow {
            out.field("Disallow", &token(pattern));
        }
    }

    for (name, policy) in &doc.agents {
        out.blank();
        agent_block(&mut out, name, policy);
    }

    let metadata: Vec<(String, String)> = doc
        .metadata
        .iter()
        .map(|(k, v)| (sanitize_key(k), text(v)))
        .filter(|(k, _)| !k.is_empty() && !is_reserved(k))
        .collect();
    if !metadata.is_empty() {
        out.blank();
        for (key, value) in &metadata {
            out.field(key, value);
        }
    }

    out.finish()
}

fn capability_block(out: &mut Out, cap: &Capability) {
    out.field("Capability", &token(&cap.id));
    if !cap.description.is_empty() {
        out.indented("Description", &text(&cap.description));
    }
    out.indented("Endpoint", &token(&cap.endpoint));
    if let Some(method) = &cap.method {
        out.indented("Method", &token(method));
    }
    out.indented("Protocol", &text(cap.protocol.as_str()));
    if let Some(auth) = &cap.auth {
        out.indented("Auth", &text(auth.auth_type.as_str()));
        if let Some(url) = &auth.token_endpoint {
            out.indented("Auth-Endpoint", &token(url));
        }
        if let Some(url) = &auth.docs_url {
            out.indented("Auth-Docs", &token(url));
        }
        if let Some(url) = &auth.registration_endpoint {
            out.indented("Registration-Endpoint", &token(url));
        }
        if !auth.scopes.is_empty() {
            out.indented("Auth-Scopes", &list(&auth.scopes));
        }
    }
    if !cap.scopes.is_empty() {
        out.indented("Scopes", &list(&cap.scopes));
    }
    if let Some(limit) = &cap.rate_limit {
        out.indented("Rate-Limit", &limit.to_string());
    }
    if let Some(url) = &cap.openapi {
        out.indented("OpenAPI", &token(url));
    }
    for param in &cap.params {
        out.indented("Param", &format_param(param));
    }
}

fn agent_block(out: &mut Out, name: &str, policy: &AgentPolicy) {
    out.field("Agent", &text(name));
    if let Some(limit) = &policy.rate_limit {
        out.indented("Rate-Limit", &limit.to_string());
    }
    if let Some(ids) = &policy.capabilities {
        out.indented("Capabilities", &list(ids));
    }
}

// --- helpers -----------------------------------------------------------------

/// Line buffer for the text form.
#[derive(Default)]
pub(crate) struct Out {
    buf: String,
}

impl Out {
    pub fn comment(&mut self, text: &str) {
        self.buf.push_str("# ");
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    pub fn field(&mut self, key: &str, value: &str) {
        self.buf.push_str(&format!("{key}: {value}\n"));
    }

    pub fn indented(&mut self, key: &str, value: &str) {
        self.buf.push_str(&format!("  {key}: {value}\n"));
    }

    pub fn blank(&mut self) {
        self.buf.push('\n');
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

/// Free text: names, descriptions, metadata values.
pub(crate) fn text(s: &str) -> String {
    sanitize_value(s, MAX_FIELD_LEN)
}

/// Single-token values (ids, URLs, globs) additionally lose all whitespace.
pub(crate) fn token(s: &str) -> String {
    text(s).chars().filter(|c| !c.is_whitespace()).collect()
}

fn list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| token(item).replace(',', ""))
        .filter(|item| !item.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.iter().any(|r| r.eq_ignore_ascii_case(key))
}

// --- tests -------------------------------------------------------------------
