//! JSON form of the manifest (agents.json).
//!
//! JSON input is already typed, so parsing is a schema gate followed by
//! serde decoding rather than a tokenizer. The embedded schema
//! (`schema/agents.schema.json`, draft 2020-12) is the single statement of
//! the JSON shape; generation runs the same gate so an invalid [`Document`]
//! fails loudly instead of producing broken output.

use std::sync::LazyLock;

use serde_json::Value;
use thiserror::Error;

use crate::diagnostics::{Diagnostic, InputError, IssueCode, ParseResult, Sink};
use crate::grammar::{is_absolute_url, is_valid_timestamp};
use crate::limits::ParseOptions;
use crate::types::Document;

static AGENTS_SCHEMA: LazyLock<jsonschema::Validator> = LazyLock::new(|| {
    let schema: Value = serde_json::from_str(include_str!("../schema/agents.schema.json"))
        .expect("invalid agents schema JSON");
    jsonschema::validator_for(&schema).expect("invalid agents schema")
});

const DOCUMENT_KEYS: &[&str] = &[
    "specVersion",
    "generatedAt",
    "site",
    "capabilities",
    "access",
    "agents",
    "metadata",
];

const CAPABILITY_KEYS: &[&str] = &[
    "id",
    "description",
    "endpoint",
    "method",
    "protocol",
    "auth",
    "rateLimit",
    "openapi",
    "params",
    "scopes",
];

/// Errors returned by the JSON generators.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The document does not satisfy the schema; nothing was emitted.
    #[error("document fails schema validation ({} issue(s))", .0.len())]
    Schema(Vec<Diagnostic>),

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Parse agents.json.
///
/// A payload that is not JSON at all yields a single `INVALID_JSON` error;
/// valid JSON of the wrong shape yields one `SCHEMA_VIOLATION` per offending
/// field, each carrying a dot-joined path such as `capabilities.0.protocol`.
pub fn parse_json(input: &str, options: &ParseOptions) -> Result<ParseResult<Document>, InputError> {
    options.check_size(input)?;

    let value = match decode(input) {
        Ok(value) => value,
        Err(d) => return Ok(ParseResult::failure(d)),
    };

    let violations = schema_violations(&AGENTS_SCHEMA, &value);
    if !violations.is_empty() {
        return Ok(ParseResult::from_parts(None, violations, Vec::new()));
    }

    let mut sink = Sink::default();
    warn_unknown_keys(&value, DOCUMENT_KEYS, "", &mut sink);
    if let Some(caps) = value.get("capabilities").and_then(Value::as_array) {
        for (i, cap) in caps.iter().enumerate() {
            warn_unknown_keys(cap, CAPABILITY_KEYS, &format!("capabilities.{i}"), &mut sink);
        }
    }

    let doc: Document = match serde_json::from_value(value) {
        Ok(doc) => doc,
        Err(e) => {
            return Ok(ParseResult::failure(Diagnostic::new(
                IssueCode::SchemaViolation,
                e.to_string(),
            )))
        }
    };

    for d in url_errors(&doc) {
        sink.error(d);
    }
    for d in enum_warnings(&doc) {
        sink.warn(d);
    }
    if let Some(ts) = &doc.generated_at {
        if !is_valid_timestamp(ts) {
            sink.warn(
                Diagnostic::new(
                    IssueCode::InvalidTimestamp,
                    format!("generatedAt {ts:?} is not an RFC 3339 timestamp"),
                )
                .at_field("generatedAt"),
            );
        }
    }
    if doc.capabilities.len() > options.max_capabilities {
        sink.error(
            Diagnostic::new(
                IssueCode::LimitExceeded,
                format!(
                    "manifest declares {} capabilities; the limit is {}",
                    doc.capabilities.len(),
                    options.max_capabilities
                ),
            )
            .at_field("capabilities"),
        );
    }

    let doc = Document {
        access: doc.access.normalized(),
        agents: doc
            .agents
            .into_iter()
            .map(|(name, policy)| (name, policy.normalized()))
            .collect(),
        ..doc
    };
    Ok(sink.finish(Some(doc)))
}

/// Serialize a document as pretty-printed agents.json.
///
/// Agent and metadata order is preserved. Fails with
/// [`GenerateError::Schema`] if the document would not pass
/// [`parse_json`].
pub fn generate_json(doc: &Document) -> Result<String, GenerateError> {
    let value = serde_json::to_value(doc)?;
    let mut problems = schema_violations(&AGENTS_SCHEMA, &value);
    problems.extend(url_errors(doc));
    if !problems.is_empty() {
        return Err(GenerateError::Schema(problems));
    }
    Ok(serde_json::to_string_pretty(&value)?)
}

// --- shared with the policy variant ------------------------------------------

pub(crate) fn decode(input: &str) -> Result<Value, Diagnostic> {
    serde_json::from_str(input)
        .map_err(|e| Diagnostic::new(IssueCode::InvalidJson, e.to_string()).at_line(e.line()))
}

/// Run `validator` over `value`, one diagnostic per violation.
pub(crate) fn schema_violations(validator: &jsonschema::Validator, value: &Value) -> Vec<Diagnostic> {
    validator
        .iter_errors(value)
        .map(|e| {
            let path = pointer_to_path(&e.instance_path.to_string());
            let d = Diagnostic::new(IssueCode::SchemaViolation, e.to_string());
            if path.is_empty() {
                d
            } else {
                d.at_field(path)
            }
        })
        .collect()
}

/// `/capabilities/0/id` → `capabilities.0.id`.
pub(crate) fn pointer_to_path(pointer: &str) -> String {
    pointer
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.replace("~1", "/").replace("~0", "~"))
        .collect::<Vec<_>>()
        .join(".")
}

pub(crate) fn warn_unknown_keys(value: &Value, known: &[&str], path: &str, sink: &mut Sink) {
    let Some(obj) = value.as_object() else {
        return;
    };
    for key in obj.keys().filter(|k| !known.contains(&k.as_str())) {
        let field = if path.is_empty() {
            key.clone()
        } else {
            format!("{path}.{key}")
        };
        sink.warn(
            Diagnostic::new(IssueCode::UnknownField, format!("unknown field {key:?}; ignored"))
                .at_field(field),
        );
    }
}

// --- helpers -----------------------------------------------------------------

fn url_errors(doc: &Document) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    if !is_absolute_url(&doc.site.url) {
        out.push(
            Diagnostic::new(
                IssueCode::InvalidUrl,
                format!("site URL {:?} is not an absolute URL", doc.site.url),
            )
            .at_field("site.url"),
        );
    }
    for (i, cap) in doc.capabilities.iter().enumerate() {
        if !is_absolute_url(&cap.endpoint) {
            out.push(
                Diagnostic::new(
                    IssueCode::InvalidUrl,
                    format!(
                        "capability {:?}: endpoint {:?} is not an absolute URL",
                        cap.id, cap.endpoint
                    ),
                )
                .at_field(format!("capabilities.{i}.endpoint")),
            );
        }
    }
    out
}

fn enum_warnings(doc: &Document) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for (i, cap) in doc.capabilities.iter().enumerate() {
        if !cap.protocol.is_known() {
            out.push(
                Diagnostic::new(
                    IssueCode::UnknownProtocol,
                    format!("protocol {:?} is not a known protocol; kept as-is", cap.protocol.as_str()),
                )
                .at_field(format!("capabilities.{i}.protocol")),
            );
        }
        if let Some(auth) = &cap.auth {
            if !auth.auth_type.is_known() {
                out.push(
                    Diagnostic::new(
                        IssueCode::UnknownAuthType,
                        format!(
                            "auth type {:?} is not a known auth type; kept as-is",
                            auth.auth_type.as_str()
                        ),
                    )
                    .at_field(format!("capabilities.{i}.auth.type")),
                );
            }
        }
    }
    out
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        AgentPolicy, AuthConfig, AuthType, Capability, Location, ParameterDef, Protocol,
        RateLimit, Site, Window,
    };

    fn parse(input: &str) -> ParseResult<Document> {
        parse_json(input, &ParseOptions::default()).unwrap()
    }

    fn sample() -> Document {
        let mut doc = Document::new(Site::new("Example", "https://example.com"));
        doc.generated_at = Some("2026-03-01T12:00:00Z".into());
        let mut cap = Capability::new("search", "https://example.com/api/search", Protocol::Rest);
        cap.description = "Search everything".into();
        cap.auth = Some(AuthConfig {
            auth_type: AuthType::OAuth2,
            token_endpoint: Some("https://example.com/oauth/token".into()),
            scopes: vec!["read".into()],
            ..AuthConfig::default()
        });
        cap.rate_limit = Some(RateLimit::new(30, Window::Minute));
        cap.params.push(ParameterDef {
            name: "limit".into(),
            location: Location::Query,
            param_type: "integer".into(),
            required: false,
            description: Some("Page size".into()),
            min: Some(1.0),
            max: Some(100.5),
        });
        doc.capabilities.push(cap);
        doc.agents.insert("ZetaBot".into(), AgentPolicy::default());
        doc.agents.insert(
            "AlphaBot".into(),
            AgentPolicy {
                rate_limit: Some(RateLimit::new(5, Window::Second)),
                capabilities: Some(vec!["search".into()]),
            },
        );
        doc.metadata.insert("X-Owner".into(), "Platform".into());
        doc
    }

    #[test]
    fn generate_then_parse_is_exact() {
        let doc = sample();
        let json = generate_json(&doc).unwrap();
        let result = parse(&json);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.document.unwrap(), doc);
    }

    #[test]
    fn agent_order_survives() {
        let json = generate_json(&sample()).unwrap();
        let doc = parse(&json).document.unwrap();
        let names: Vec<_> = doc.agents.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["ZetaBot", "AlphaBot"]);
    }

    #[test]
    fn syntax_error_is_distinct_from_schema_error() {
        let result = parse("{ not json");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, IssueCode::InvalidJson);
        assert!(result.errors[0].line.is_some());

        let result = parse(r#"{"specVersion": "1.0"}"#);
        assert!(result
            .errors
            .iter()
            .all(|e| e.code == IssueCode::SchemaViolation));
    }

    #[test]
    fn wrong_type_reports_dot_path() {
        let result = parse(
            r#"{
                "specVersion": "1.0",
                "site": {"name": "T", "url": "https://t.com"},
                "capabilities": [{"id": "a", "endpoint": "https://t.com/a", "protocol": 5}]
            }"#,
        );
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, IssueCode::SchemaViolation);
        assert_eq!(result.errors[0].field.as_deref(), Some("capabilities.0.protocol"));
    }

    #[test]
    fn invalid_capability_id_is_a_schema_violation() {
        let result = parse(
            r#"{
                "specVersion": "1.0",
                "site": {"name": "T", "url": "https://t.com"},
                "capabilities": [{"id": "Not Valid", "endpoint": "https://t.com/a", "protocol": "REST"}]
            }"#,
        );
        assert_eq!(result.errors[0].field.as_deref(), Some("capabilities.0.id"));
    }

    #[test]
    fn zero_request_rate_limit_is_rejected() {
        let result = parse(
            r#"{
                "specVersion": "1.0",
                "site": {"name": "T", "url": "https://t.com"},
                "agents": {"*": {"rateLimit": {"requests": 0, "window": "minute"}}}
            }"#,
        );
        assert_eq!(
            result.errors[0].field.as_deref(),
            Some("agents.*.rateLimit.requests")
        );
    }

    #[test]
    fn unknown_protocol_is_accepted_with_warning() {
        let result = parse(
            r#"{
                "specVersion": "1.0",
                "site": {"name": "T", "url": "https://t.com"},
                "capabilities": [{"id": "a", "endpoint": "https://t.com/a", "protocol": "gRPC"}]
            }"#,
        );
        let doc = result.document.unwrap();
        assert_eq!(doc.capabilities[0].protocol, Protocol::Other("gRPC".into()));
        assert_eq!(result.warnings[0].code, IssueCode::UnknownProtocol);
        assert_eq!(result.warnings[0].field.as_deref(), Some("capabilities.0.protocol"));
    }

    #[test]
    fn relative_endpoint_is_an_error() {
        let result = parse(
            r#"{
                "specVersion": "1.0",
                "site": {"name": "T", "url": "https://t.com"},
                "capabilities": [{"id": "a", "endpoint": "/api/a", "protocol": "REST"}]
            }"#,
        );
        assert!(result.document.is_none());
        assert_eq!(result.errors[0].code, IssueCode::InvalidUrl);
        assert_eq!(result.errors[0].field.as_deref(), Some("capabilities.0.endpoint"));
    }

    #[test]
    fn unknown_keys_warn() {
        let result = parse(
            r#"{"specVersion": "1.0", "site": {"name": "T", "url": "https://t.com"}, "extra": true}"#,
        );
        assert!(result.is_ok());
        assert_eq!(result.warnings[0].code, IssueCode::UnknownField);
        assert_eq!(result.warnings[0].field.as_deref(), Some("extra"));
    }

    #[test]
    fn empty_allow_is_normalized() {
        let doc = parse(
            r#"{"specVersion": "1.0", "site": {"name": "T", "url": "https://t.com"}, "access": {"allow": [], "disallow": ["/x"]}}"#,
        )
        .document
        .unwrap();
        assert_eq!(doc.access.allow, vec!["*"]);
    }

    #[test]
    fn wildcard_capability_list_means_all() {
        let doc = parse(
            r#"{"specVersion": "1.0", "site": {"name": "T", "url": "https://t.com"}, "agents": {"Bot": {"capabilities": ["*"]}, "Other": {"capabilities": ["*", "a"]}}}"#,
        )
        .document
        .unwrap();
        assert_eq!(doc.agents["Bot"].capabilities, None);
        assert_eq!(
            doc.agents["Other"].capabilities,
            Some(vec!["*".to_string(), "a".to_string()])
        );
    }

    #[test]
    fn param_type_with_delimiters_fails_schema() {
        let result = parse(
            r#"{"specVersion": "1.0", "site": {"name": "T", "url": "https://t.com"}, "capabilities": [{"id": "a", "endpoint": "https://t.com/a", "protocol": "REST", "params": [{"name": "q", "in": "query", "type": "map(string, int)"}]}]}"#,
        );
        assert!(result.document.is_none());
        assert_eq!(result.errors[0].code, IssueCode::SchemaViolation);
        assert_eq!(result.errors[0].field.as_deref(), Some("capabilities.0.params.0.type"));
    }

    #[test]
    fn oversized_input_is_a_precondition_error() {
        let options = ParseOptions {
            max_bytes: 4,
            ..ParseOptions::default()
        };
        assert!(parse_json("{\"a\": 1}", &options).is_err());
    }

    #[test]
    fn generate_rejects_invalid_document() {
        let mut doc = sample();
        doc.capabilities[0].id = "Bad Id".into();
        doc.site.url = "not a url".into();
        match generate_json(&doc) {
            Err(GenerateError::Schema(problems)) => {
                let fields: Vec<_> = problems.iter().filter_map(|d| d.field.as_deref()).collect();
                assert!(fields.contains(&"capabilities.0.id"));
                assert!(fields.contains(&"site.url"));
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn pointer_conversion() {
        assert_eq!(pointer_to_path("/capabilities/0/id"), "capabilities.0.id");
        assert_eq!(pointer_to_path(""), "");
        assert_eq!(pointer_to_path("/agents/a~1b"), "agents.a/b");
    }
}
