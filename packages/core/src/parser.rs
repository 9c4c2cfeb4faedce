//! Text-form parser for agents.txt.
//!
//! The parser walks the input line by line with one piece of state: the
//! block currently open ([`Block`]). A non-indented line flushes the open
//! block into the result before it is handled as a top-level directive, and
//! the final block is flushed at end of input.
//!
//! ```text
//! Site-Name: Example
//! Site-URL: https://example.com
//!
//! Capability: search
//!   Endpoint: https://example.com/api/search
//!   Protocol: REST
//!   Param: q (query, string, required) — Search terms
//!
//! Agent: *
//!   Rate-Limit: 60/minute
//! ```
//!
//! Required site fields are checked only after the whole input is scanned,
//! so every diagnostic in the file is reported in one pass.

use indexmap::IndexMap;

use crate::diagnostics::{Diagnostic, InputError, IssueCode, ParseResult, Sink};
use crate::grammar::{
    generated_comment, is_absolute_url, is_known_method, is_valid_capability_id,
    is_valid_timestamp, is_valid_version, parse_param, parse_rate_limit, sanitize_key, scan_lines,
    split_list, LineKind,
};
use crate::limits::{ParseOptions, MAX_SITE_NAME_LEN};
use crate::types::{
    AccessControl, AgentPolicy, AuthConfig, AuthType, Capability, Document, ParameterDef,
    Protocol, RateLimit, Site, SPEC_VERSION, WILDCARD_AGENT,
};

/// Parse the text form of an agents.txt manifest.
///
/// Returns `Err` only when `input` exceeds `options.max_bytes`; every
/// content problem is reported inside the [`ParseResult`].
pub fn parse_text(input: &str, options: &ParseOptions) -> Result<ParseResult<Document>, InputError> {
    options.check_size(input)?;

    let mut parser = TextParser::new(options);
    for line in scan_lines(input) {
        parser.line(line.number, line.kind);
    }
    parser.flush();
    Ok(parser.finish())
}

// --- block state -------------------------------------------------------------

/// The block currently accumulating indented fields. At most one block is
/// open at a time.
#[derive(Debug, Default)]
enum Block {
    #[default]
    None,
    Capability(PartialCapability),
    Agent(PartialAgent),
}

#[derive(Debug)]
struct PartialCapability {
    id: String,
    line: usize,
    /// An invalid id is reported when the block opens; the block is still
    /// consumed so its indented lines don't turn into orphan warnings.
    valid_id: bool,
    description: Option<String>,
    endpoint: Option<(String, usize)>,
    method: Option<String>,
    protocol: Option<Protocol>,
    auth: Option<AuthConfig>,
    auth_type_set: bool,
    rate_limit: Option<RateLimit>,
    openapi: Option<String>,
    params: Vec<ParameterDef>,
    scopes: Vec<String>,
}

impl PartialCapability {
    fn open(id: &str, line: usize) -> Self {
        Self {
            id: id.to_string(),
            line,
            valid_id: is_valid_capability_id(id),
            description: None,
            endpoint: None,
            method: None,
            protocol: None,
            auth: None,
            auth_type_set: false,
            rate_limit: None,
            openapi: None,
            params: Vec::new(),
            scopes: Vec::new(),
        }
    }

    fn auth(&mut self) -> &mut AuthConfig {
        self.auth.get_or_insert_with(AuthConfig::default)
    }

    fn field(&mut self, key: &str, value: &str, line: usize, sink: &mut Sink) {
        match key.to_ascii_lowercase().as_str() {
            "endpoint" => self.endpoint = Some((value.to_string(), line)),
            "description" => self.description = Some(value.to_string()),
            "protocol" => {
                let protocol = Protocol::from_wire(value);
                if !protocol.is_known() {
                    sink.warn(
                        Diagnostic::new(
                            IssueCode::UnknownProtocol,
                            format!(
                                "protocol {value:?} is not one of REST, MCP, A2A, GraphQL, WebSocket; kept as-is"
                            ),
                        )
                        .at_line(line),
                    );
                }
                self.protocol = Some(protocol);
            }
            "method" => {
                let method = value.to_ascii_uppercase();
                if !is_known_method(&method) {
                    sink.warn(
                        Diagnostic::new(
                            IssueCode::UnknownMethod,
                            format!("method {value:?} is not a standard HTTP verb"),
                        )
                        .at_line(line),
                    );
                }
                self.method = Some(method);
            }
            "auth" => {
                let auth_type = AuthType::from_wire(value);
                if !auth_type.is_known() {
                    sink.warn(
                        Diagnostic::new(
                            IssueCode::UnknownAuthType,
                            format!(
                                "auth type {value:?} is not one of none, api-key, bearer-token, oauth2, hmac; kept as-is"
                            ),
                        )
                        .at_line(line),
                    );
                }
                self.auth().auth_type = auth_type;
                self.auth_type_set = true;
            }
            "auth-endpoint" => self.auth().token_endpoint = Some(value.to_string()),
            "auth-docs" => self.auth().docs_url = Some(value.to_string()),
            "registration-endpoint" => {
                self.auth().registration_endpoint = Some(value.to_string())
            }
            "auth-scopes" => self.auth().scopes = split_list(value),
            "scopes" => self.scopes = split_list(value),
            "rate-limit" => self.rate_limit = rate_limit_or_warn(value, line, sink),
            "openapi" => self.openapi = Some(value.to_string()),
            "param" => match parse_param(value) {
                Ok(param) => self.params.push(param),
                Err(msg) => {
                    sink.warn(Diagnostic::new(IssueCode::InvalidParam, msg).at_line(line));
                }
            },
            _ => sink.warn(unknown_field(key, &format!("capability {:?}", self.id), line)),
        }
    }

    fn finish(self, sink: &mut Sink) -> Option<Capability> {
        if !self.valid_id {
            return None;
        }

        let endpoint = match self.endpoint {
            Some((endpoint, line)) => {
                if !is_absolute_url(&endpoint) {
                    sink.error(
                        Diagnostic::new(
                            IssueCode::InvalidUrl,
                            format!(
                                "capability {:?}: endpoint {endpoint:?} is not an absolute URL",
                                self.id
                            ),
                        )
                        .at_line(line),
                    );
                    return None;
                }
                endpoint
            }
            None => {
                sink.error(
                    Diagnostic::new(
                        IssueCode::MissingField,
                        format!("capability {:?} is missing Endpoint", self.id),
                    )
                    .at_line(self.line),
                );
                return None;
            }
        };

        let protocol = self.protocol.unwrap_or_else(|| {
            sink.warn(
                Diagnostic::new(
                    IssueCode::DefaultApplied,
                    format!("capability {:?} has no Protocol; assuming REST", self.id),
                )
                .at_line(self.line),
            );
            Protocol::Rest
        });

        if self.auth.is_some() && !self.auth_type_set {
            sink.warn(
                Diagnostic::new(
                    IssueCode::DefaultApplied,
                    format!(
                        "capability {:?} has auth fields but no Auth type; assuming none",
                        self.id
                    ),
                )
                .at_line(self.line),
            );
        }

        Some(Capability {
            id: self.id,
            description: self.description.unwrap_or_default(),
            endpoint,
            method: self.method,
            protocol,
            auth: self.auth,
            rate_limit: self.rate_limit,
            openapi: self.openapi,
            params: self.params,
            scopes: self.scopes,
        })
    }
}

#[derive(Debug)]
struct PartialAgent {
    name: String,
    line: usize,
    policy: AgentPolicy,
}

impl PartialAgent {
    fn field(&mut self, key: &str, value: &str, line: usize, sink: &mut Sink) {
        match key.to_ascii_lowercase().as_str() {
            "rate-limit" => self.policy.rate_limit = rate_limit_or_warn(value, line, sink),
            "capabilities" => {
                // `Capabilities: *` is the explicit spelling of "all".
                self.policy.capabilities = if value == WILDCARD_AGENT {
                    None
                } else {
                    Some(split_list(value))
                };
            }
            _ => sink.warn(unknown_field(key, &format!("agent {:?}", self.name), line)),
        }
    }
}

// --- parser ------------------------------------------------------------------

struct TextParser<'o> {
    options: &'o ParseOptions,
    sink: Sink,
    block: Block,

    spec_version: Option<String>,
    generated_at: Option<String>,
    site_name: Option<(String, usize)>,
    site_url: Option<(String, usize)>,
    site_description: Option<String>,
    contact: Option<String>,
    privacy_policy: Option<String>,
    capabilities: Vec<Capability>,
    allow: Vec<String>,
    disallow: Vec<String>,
    agents: IndexMap<String, AgentPolicy>,
    metadata: IndexMap<String, String>,
}

impl<'o> TextParser<'o> {
    fn new(options: &'o ParseOptions) -> Self {
        Self {
            options,
            sink: Sink::default(),
            block: Block::None,
            spec_version: None,
            generated_at: None,
            site_name: None,
            site_url: None,
            site_description: None,
            contact: None,
            privacy_policy: None,
            capabilities: Vec::new(),
            allow: Vec::new(),
            disallow: Vec::new(),
            agents: IndexMap::new(),
            metadata: IndexMap::new(),
        }
    }

    fn line(&mut self, number: usize, kind: LineKind<'_>) {
        match kind {
            LineKind::Blank => {}
            LineKind::Comment(text) => {
                if self.generated_at.is_none() {
                    self.generated_at = generated_comment(text)
                        .filter(|ts| is_valid_timestamp(ts))
                        .map(str::to_string);
                }
            }
            LineKind::Malformed { text, indented } => {
                if !indented {
                    self.flush();
                }
                self.sink.warn(
                    Diagnostic::new(
                        IssueCode::MalformedLine,
                        format!("expected `Key: Value`, got {text:?}"),
                    )
                    .at_line(number),
                );
            }
            LineKind::Field {
                key,
                value,
                indented: true,
            } => match &mut self.block {
                Block::Capability(cap) => cap.field(key, value, number, &mut self.sink),
                Block::Agent(agent) => agent.field(key, value, number, &mut self.sink),
                Block::None => self.sink.warn(
                    Diagnostic::new(
                        IssueCode::OrphanField,
                        format!("indented field {key:?} is not inside a Capability or Agent block"),
                    )
                    .at_line(number),
                ),
            },
            LineKind::Field {
                key,
                value,
                indented: false,
            } => {
                self.flush();
                self.top_level(key, value, number);
            }
        }
    }

    fn top_level(&mut self, key: &str, value: &str, line: usize) {
        match key.to_ascii_lowercase().as_str() {
            "spec-version" => {
                if is_valid_version(value) {
                    self.spec_version = Some(value.to_string());
                } else {
                    self.sink.warn(
                        Diagnostic::new(
                            IssueCode::InvalidVersion,
                            format!("Spec-Version {value:?} is not major.minor; using {SPEC_VERSION}"),
                        )
                        .at_line(line),
                    );
                }
            }
            "site-name" => self.site_name = Some((value.to_string(), line)),
            "site-url" => self.site_url = Some((value.to_string(), line)),
            "site-description" | "description" => {
                self.site_description = Some(value.to_string())
            }
            "contact" => self.contact = Some(value.to_string()),
            "privacy-policy" => self.privacy_policy = Some(value.to_string()),
            "allow" => push_pattern(&mut self.allow, value),
            "disallow" => push_pattern(&mut self.disallow, value),
            "capability" => {
                let cap = PartialCapability::open(value, line);
                if !cap.valid_id {
                    self.sink.error(
                        Diagnostic::new(
                            IssueCode::InvalidId,
                            format!("capability id {value:?} must match ^[a-z0-9][a-z0-9-]*$"),
                        )
                        .at_line(line),
                    );
                }
                self.block = Block::Capability(cap);
            }
            "agent" => {
                if value.is_empty() {
                    self.sink.warn(
                        Diagnostic::new(IssueCode::InvalidValue, "Agent requires a name or `*`")
                            .at_line(line),
                    );
                    return;
                }
                self.block = Block::Agent(PartialAgent {
                    name: value.to_string(),
                    line,
                    policy: AgentPolicy::default(),
                });
            }
            _ => {
                if let Some(d) = rewritten_key(key, line) {
                    self.sink.warn(d);
                }
                self.metadata.insert(key.to_string(), value.to_string());
            }
        }
    }

    /// Commit the open block, if any, and return to top level.
    fn flush(&mut self) {
        match std::mem::take(&mut self.block) {
            Block::None => {}
            Block::Capability(cap) => {
                if let Some(cap) = cap.finish(&mut self.sink) {
                    self.capabilities.push(cap);
                }
            }
            Block::Agent(agent) => {
                if self.agents.contains_key(&agent.name) {
                    self.sink.warn(
                        Diagnostic::new(
                            IssueCode::DuplicateAgent,
                            format!("agent {:?} is declared more than once; the later block wins", agent.name),
                        )
                        .at_line(agent.line),
                    );
                }
                self.agents.insert(agent.name, agent.policy);
            }
        }
    }

    fn finish(mut self) -> ParseResult<Document> {
        let site = required_site(self.site_name.take(), self.site_url.take(), &mut self.sink);

        if self.capabilities.len() > self.options.max_capabilities {
            self.sink.error(Diagnostic::new(
                IssueCode::LimitExceeded,
                format!(
                    "manifest declares {} capabilities; the limit is {}",
                    self.capabilities.len(),
                    self.options.max_capabilities
                ),
            ));
        }

        let Some((name, url)) = site else {
            return self.sink.finish(None);
        };

        let document = Document {
            spec_version: self.spec_version.unwrap_or_else(|| SPEC_VERSION.to_string()),
            generated_at: self.generated_at,
            site: Site {
                name,
                url,
                description: self.site_description,
                contact: self.contact,
                privacy_policy: self.privacy_policy,
            },
            capabilities: self.capabilities,
            access: AccessControl {
                allow: self.allow,
                disallow: self.disallow,
            }
            .normalized(),
            agents: self.agents,
            metadata: self.metadata,
        };
        self.sink.finish(Some(document))
    }
}

// --- helpers -----------------------------------------------------------------

/// Check the two required site fields once the scan is complete.
///
/// Each argument is the last value seen and its line. Returns the pair only
/// when both are present and usable.
pub(crate) fn required_site(
    name: Option<(String, usize)>,
    url: Option<(String, usize)>,
    sink: &mut Sink,
) -> Option<(String, String)> {
    let name = required(name, "Site-Name", sink);
    let url = required(url, "Site-URL", sink);
    let mut usable = true;

    if let Some((name, line)) = &name {
        if name.chars().count() > MAX_SITE_NAME_LEN {
            sink.error(
                Diagnostic::new(
                    IssueCode::InvalidField,
                    format!("Site-Name must be at most {MAX_SITE_NAME_LEN} characters"),
                )
                .at_line(*line),
            );
            usable = false;
        }
    }
    if let Some((url, line)) = &url {
        if !is_absolute_url(url) {
            sink.error(
                Diagnostic::new(
                    IssueCode::InvalidUrl,
                    format!("Site-URL {url:?} is not an absolute URL"),
                )
                .at_line(*line),
            );
            usable = false;
        }
    }
    match (name, url) {
        (Some((name, _)), Some((url, _))) if usable => Some((name, url)),
        _ => None,
    }
}

fn required(field: Option<(String, usize)>, name: &str, sink: &mut Sink) -> Option<(String, usize)> {
    match field {
        Some((value, line)) if !value.is_empty() => Some((value, line)),
        Some((_, line)) => {
            sink.error(
                Diagnostic::new(IssueCode::MissingField, format!("{name} must not be empty"))
                    .at_line(line),
            );
            None
        }
        None => {
            sink.error(Diagnostic::new(
                IssueCode::MissingField,
                format!("{name} is required"),
            ));
            None
        }
    }
}

pub(crate) fn rate_limit_or_warn(value: &str, line: usize, sink: &mut Sink) -> Option<RateLimit> {
    match parse_rate_limit(value) {
        Ok(limit) => Some(limit),
        Err(msg) => {
            sink.warn(Diagnostic::new(IssueCode::InvalidRateLimit, msg).at_line(line));
            None
        }
    }
}

pub(crate) fn unknown_field(key: &str, owner: &str, line: usize) -> Diagnostic {
    Diagnostic::new(
        IssueCode::UnknownField,
        format!("unknown field {key:?} in {owner}; ignored"),
    )
    .at_line(line)
}

/// Metadata keys are kept verbatim, but the generators reduce them to
/// [`sanitize_key`]; flag the ones that won't come back unchanged.
pub(crate) fn rewritten_key(key: &str, line: usize) -> Option<Diagnostic> {
    let written = sanitize_key(key);
    (written != key).then(|| {
        Diagnostic::new(
            IssueCode::InvalidValue,
            format!("metadata key {key:?} is kept as-is but will be written as {written:?}"),
        )
        .at_line(line)
    })
}

/// Append a path pattern, skipping empty values.
pub(crate) fn push_pattern(list: &mut Vec<String>, value: &str) {
    if !value.is_empty() {
        list.push(value.to_string());
    }
}

/// Convenience wrapper using [`ParseOptions::default`].
pub fn parse_text_default(input: &str) -> Result<ParseResult<Document>, InputError> {
    parse_text(input, &ParseOptions::default())
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Location, Window};

    fn parse_ok(input: &str) -> (Document, Vec<Diagnostic>) {
        let result = parse_text_default(input).unwrap();
        assert!(result.errors.is_empty(), "unexpected errors: {:?}", result.errors);
        (result.document.unwrap(), result.warnings)
    }

    fn parse_err(input: &str) -> Vec<Diagnostic> {
        let result = parse_text_default(input).unwrap();
        assert!(result.document.is_none());
        result.errors
    }

    const FULL: &str = "\
# agents.txt
# Generated: 2026-03-01T12:00:00Z
Spec-Version: 1.0
Site-Name: Example Shop
Site-URL: https://shop.example.com
Description: Buy things
Contact: ops@example.com
Privacy-Policy: https://shop.example.com/privacy

Capability: product-search
  Description: Search the catalogue
  Endpoint: https://shop.example.com/api/search
  Method: get
  Protocol: REST
  Auth: oauth2
  Auth-Endpoint: https://shop.example.com/oauth/token
  Auth-Docs: https://shop.example.com/docs/auth
  Registration-Endpoint: https://shop.example.com/oauth/register
  Scopes: catalog:read, catalog:search
  Rate-Limit: 100/minute
  OpenAPI: https://shop.example.com/openapi.json
  Param: q (query, string, required) — Search terms
  Param: since (query, date-time) -- Only items after this time

Capability: checkout
  Endpoint: https://shop.example.com/mcp
  Protocol: MCP

Allow: /products/*
Disallow: /admin/*

Agent: *
  Rate-Limit: 10/minute

Agent: ShopBot
  Rate-Limit: 1000/hour
  Capabilities: product-search
X-Owner: Platform Team
";

    #[test]
    fn full_manifest() {
        let (doc, warnings) = parse_ok(FULL);
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");

        assert_eq!(doc.spec_version, "1.0");
        assert_eq!(doc.generated_at.as_deref(), Some("2026-03-01T12:00:00Z"));
        assert_eq!(doc.site.name, "Example Shop");
        assert_eq!(doc.site.description.as_deref(), Some("Buy things"));
        assert_eq!(doc.capabilities.len(), 2);

        let search = &doc.capabilities[0];
        assert_eq!(search.id, "product-search");
        assert_eq!(search.method.as_deref(), Some("GET"));
        let auth = search.auth.as_ref().unwrap();
        assert_eq!(auth.auth_type, AuthType::OAuth2);
        assert_eq!(
            auth.registration_endpoint.as_deref(),
            Some("https://shop.example.com/oauth/register")
        );
        assert_eq!(search.scopes, vec!["catalog:read", "catalog:search"]);
        assert_eq!(search.rate_limit, Some(RateLimit::new(100, Window::Minute)));
        assert_eq!(search.params.len(), 2);
        assert_eq!(search.params[1].param_type, "date-time");
        assert_eq!(search.params[1].location, Location::Query);

        assert_eq!(doc.capabilities[1].protocol, Protocol::Mcp);
        assert_eq!(doc.access.allow, vec!["/products/*"]);
        assert_eq!(doc.access.disallow, vec!["/admin/*"]);

        let names: Vec<_> = doc.agents.keys().cloned().collect();
        assert_eq!(names, vec!["*", "ShopBot"]);
        assert_eq!(
            doc.agents["ShopBot"].capabilities,
            Some(vec!["product-search".to_string()])
        );
        assert_eq!(doc.metadata["X-Owner"], "Platform Team");
    }

    #[test]
    fn last_block_is_flushed_at_end_of_input() {
        let (doc, _) = parse_ok(
            "Site-Name: Test\nSite-URL: https://test.com\n\nCapability: search\n  Endpoint: https://test.com/api/search\n  Protocol: REST",
        );
        assert_eq!(doc.capabilities.len(), 1);
        assert_eq!(doc.capabilities[0].id, "search");
    }

    #[test]
    fn last_agent_is_flushed_at_end_of_input() {
        let (doc, _) =
            parse_ok("Site-Name: Test\nSite-URL: https://test.com\nAgent: Bot\n  Rate-Limit: 5/second");
        assert_eq!(
            doc.agents["Bot"].rate_limit,
            Some(RateLimit::new(5, Window::Second))
        );
    }

    #[test]
    fn crlf_input() {
        let (doc, _) = parse_ok(
            "Site-Name: Test\r\nSite-URL: https://test.com\r\nCapability: a\r\n  Endpoint: https://test.com/a\r\n  Protocol: REST\r\n",
        );
        assert_eq!(doc.capabilities[0].endpoint, "https://test.com/a");
    }

    #[test]
    fn tab_indentation() {
        let (doc, _) = parse_ok(
            "Site-Name: Test\nSite-URL: https://test.com\nCapability: a\n\tEndpoint: https://test.com/a\n\tProtocol: REST\n",
        );
        assert_eq!(doc.capabilities.len(), 1);
    }

    #[test]
    fn top_level_line_closes_block() {
        let (doc, warnings) = parse_ok(
            "Site-Name: Test\nCapability: a\n  Endpoint: https://test.com/a\n  Protocol: REST\nSite-URL: https://test.com\n  Protocol: MCP\n",
        );
        assert_eq!(doc.capabilities[0].protocol, Protocol::Rest);
        assert_eq!(warnings[0].code, IssueCode::OrphanField);
        assert_eq!(warnings[0].line, Some(6));
    }

    #[test]
    fn missing_site_name_is_an_error() {
        let errors = parse_err("Site-URL: https://test.com\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, IssueCode::MissingField);
        assert!(errors[0].message.contains("Site-Name"));
    }

    #[test]
    fn missing_site_url_is_reported_even_with_capabilities() {
        let errors = parse_err(
            "Site-Name: Test\nCapability: a\n  Endpoint: https://test.com/a\n  Protocol: REST\n",
        );
        assert!(errors.iter().any(|e| e.message.contains("Site-URL")));
    }

    #[test]
    fn both_required_fields_missing() {
        let errors = parse_err("# nothing here\n");
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn zero_rate_limit_warns_and_leaves_field_unset() {
        let (doc, warnings) = parse_ok(
            "Site-Name: Test\nSite-URL: https://test.com\nCapability: a\n  Endpoint: https://test.com/a\n  Protocol: REST\n  Rate-Limit: 0/minute\n",
        );
        assert!(doc.capabilities[0].rate_limit.is_none());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, IssueCode::InvalidRateLimit);
        assert_eq!(warnings[0].line, Some(6));
    }

    #[test]
    fn unknown_protocol_and_auth_are_kept_with_warnings() {
        let (doc, warnings) = parse_ok(
            "Site-Name: Test\nSite-URL: https://test.com\nCapability: a\n  Endpoint: https://test.com/a\n  Protocol: gRPC\n  Auth: mtls\n",
        );
        let cap = &doc.capabilities[0];
        assert_eq!(cap.protocol, Protocol::Other("gRPC".into()));
        assert_eq!(
            cap.auth.as_ref().unwrap().auth_type,
            AuthType::Other("mtls".into())
        );
        let codes: Vec<_> = warnings.iter().map(|w| w.code).collect();
        assert_eq!(codes, vec![IssueCode::UnknownProtocol, IssueCode::UnknownAuthType]);
    }

    #[test]
    fn unknown_indented_field_warns_unknown_top_level_is_metadata() {
        let (doc, warnings) = parse_ok(
            "Site-Name: Test\nSite-URL: https://test.com\nLicense-Info: CC-BY\nCapability: a\n  Endpont: https://test.com/a\n  Endpoint: https://test.com/a\n  Protocol: REST\n",
        );
        assert_eq!(doc.metadata["License-Info"], "CC-BY");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, IssueCode::UnknownField);
        assert_eq!(warnings[0].line, Some(5));
    }

    #[test]
    fn metadata_key_the_generator_would_rewrite_warns() {
        let (doc, warnings) = parse_ok(
            "Site-Name: Test\nSite-URL: https://test.com\nX Owner: Platform\nX-Team: Core\n",
        );
        assert_eq!(doc.metadata["X Owner"], "Platform");
        assert_eq!(doc.metadata["X-Team"], "Core");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, IssueCode::InvalidValue);
        assert_eq!(warnings[0].line, Some(3));
        assert!(warnings[0].message.contains("\"XOwner\""));
    }

    #[test]
    fn line_without_colon_is_a_warning() {
        let (_, warnings) =
            parse_ok("Site-Name: Test\nthis line is garbage\nSite-URL: https://test.com\n");
        assert_eq!(warnings[0].code, IssueCode::MalformedLine);
        assert_eq!(warnings[0].line, Some(2));
    }

    #[test]
    fn invalid_capability_id_is_an_error() {
        let errors = parse_err(
            "Site-Name: Test\nSite-URL: https://test.com\nCapability: Bad_Id\n  Endpoint: https://test.com/a\n",
        );
        assert_eq!(errors[0].code, IssueCode::InvalidId);
        assert_eq!(errors[0].line, Some(3));
    }

    #[test]
    fn capability_without_endpoint_is_an_error() {
        let errors =
            parse_err("Site-Name: Test\nSite-URL: https://test.com\nCapability: a\n  Protocol: REST\n");
        assert_eq!(errors[0].code, IssueCode::MissingField);
        assert_eq!(errors[0].line, Some(3));
    }

    #[test]
    fn relative_site_url_is_an_error() {
        let errors = parse_err("Site-Name: Test\nSite-URL: /home\n");
        assert_eq!(errors[0].code, IssueCode::InvalidUrl);
    }

    #[test]
    fn overlong_site_name_is_an_error() {
        let input = format!("Site-Name: {}\nSite-URL: https://test.com\n", "x".repeat(201));
        let errors = parse_err(&input);
        assert_eq!(errors[0].code, IssueCode::InvalidField);
    }

    #[test]
    fn missing_allow_normalizes_to_catch_all() {
        let (doc, _) = parse_ok("Site-Name: Test\nSite-URL: https://test.com\nDisallow: /private\n");
        assert_eq!(doc.access.allow, vec!["*"]);
        assert_eq!(doc.access.disallow, vec!["/private"]);
    }

    #[test]
    fn missing_protocol_defaults_to_rest() {
        let (doc, warnings) = parse_ok(
            "Site-Name: Test\nSite-URL: https://test.com\nCapability: a\n  Endpoint: https://test.com/a\n",
        );
        assert_eq!(doc.capabilities[0].protocol, Protocol::Rest);
        assert_eq!(warnings[0].code, IssueCode::DefaultApplied);
    }

    #[test]
    fn duplicate_agent_warns_and_later_wins() {
        let (doc, warnings) = parse_ok(
            "Site-Name: Test\nSite-URL: https://test.com\nAgent: Bot\n  Rate-Limit: 1/second\nAgent: Bot\n  Rate-Limit: 2/second\n",
        );
        assert_eq!(doc.agents.len(), 1);
        assert_eq!(doc.agents["Bot"].rate_limit.unwrap().requests, 2);
        assert_eq!(warnings[0].code, IssueCode::DuplicateAgent);
    }

    #[test]
    fn wildcard_capabilities_means_all() {
        let (doc, _) = parse_ok(
            "Site-Name: Test\nSite-URL: https://test.com\nAgent: Bot\n  Capabilities: *\n",
        );
        assert!(doc.agents["Bot"].capabilities.is_none());
    }

    #[test]
    fn oversized_input_is_rejected_before_parsing() {
        let options = ParseOptions {
            max_bytes: 16,
            ..ParseOptions::default()
        };
        let err = parse_text("Site-Name: Test\nSite-URL: https://test.com\n", &options).unwrap_err();
        assert!(matches!(err, InputError::TooLarge { max: 16, .. }));
    }

    #[test]
    fn capability_ceiling() {
        let options = ParseOptions {
            max_capabilities: 1,
            ..ParseOptions::default()
        };
        let input = "Site-Name: Test\nSite-URL: https://test.com\nCapability: a\n  Endpoint: https://test.com/a\n  Protocol: REST\nCapability: b\n  Endpoint: https://test.com/b\n  Protocol: REST\n";
        let result = parse_text(input, &options).unwrap();
        assert!(result.document.is_none());
        assert_eq!(result.errors[0].code, IssueCode::LimitExceeded);
    }

    #[test]
    fn invalid_spec_version_warns_and_defaults() {
        let (doc, warnings) =
            parse_ok("Spec-Version: one\nSite-Name: Test\nSite-URL: https://test.com\n");
        assert_eq!(doc.spec_version, SPEC_VERSION);
        assert_eq!(warnings[0].code, IssueCode::InvalidVersion);
    }
}
