//! Reference implementation of the agents.txt manifest format.
//!
//! An origin publishes agents.txt (or its JSON twin, agents.json) to tell
//! automated callers which endpoints it exposes, how to authenticate, and
//! how fast they may call. This crate reads and writes both forms into one
//! structured [`Document`], checks it for consistency, and handles the
//! sibling ai.txt training policy. It does no I/O; see `agentstxt-client`
//! for discovery over HTTP and `agentstxt-server` for publishing.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`types`] | Data model: [`Document`], [`Site`], [`Capability`], [`AuthConfig`], [`RateLimit`], [`AgentPolicy`] |
//! | [`grammar`] | Line scanner, sanitizer, rate-limit and `Param` token grammars |
//! | [`parser`] | Text form → [`Document`] via [`parse_text`] |
//! | [`json`] | Schema-gated JSON form via [`parse_json`] and [`generate_json`] |
//! | [`validation`] | Cross-field checks via [`validate`] |
//! | [`generate`] | [`Document`] → text form via [`generate_text`] |
//! | [`policy`] | The ai.txt variant: [`PolicyDocument`] and its parsers and generators |
//! | [`diagnostics`] | [`Diagnostic`], [`IssueCode`], [`ParseResult`], [`InputError`] |
//! | [`limits`] | [`ParseOptions`] |
//!
//! # Quick start
//!
//! ```rust
//! use agentstxt::{generate_json, parse_text, validate, ParseOptions};
//!
//! let input = "\
//! Site-Name: Example
//! Site-URL: https://example.com
//!
//! Capability: search
//!   Endpoint: https://example.com/api/search
//!   Protocol: REST
//! ";
//!
//! let result = parse_text(input, &ParseOptions::default()).unwrap();
//! let doc = result.document.expect("manifest should parse");
//! assert!(validate(&doc).valid);
//!
//! let json = generate_json(&doc).unwrap();
//! assert!(json.contains("\"specVersion\""));
//! ```

pub mod diagnostics;
pub mod generate;
pub mod grammar;
pub mod json;
pub mod limits;
pub mod parser;
pub mod policy;
pub mod types;
pub mod validation;

pub use diagnostics::{Diagnostic, ErrorKind, InputError, IssueCode, ParseResult, Severity};
pub use generate::generate_text;
pub use json::{generate_json, parse_json, GenerateError};
pub use limits::ParseOptions;
pub use parser::parse_text;
pub use policy::{
    generate_policy, generate_policy_json, parse_policy, parse_policy_json, validate_policy,
    AgentTrainingPolicy, Attribution, PolicyDocument, TrainingMode, TrainingPolicy,
};
pub use types::{
    AccessControl, AgentPolicy, AuthConfig, AuthType, Capability, Document, Location,
    ParameterDef, Protocol, RateLimit, Site, Window, SPEC_VERSION,
};
pub use validation::{validate, ValidationReport};
