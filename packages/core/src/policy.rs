//! The ai.txt policy manifest.
//!
//! ai.txt is the sibling of agents.txt: instead of declaring callable
//! capabilities, it states whether content on the origin may be used for
//! model training, under which license, and with what attribution. It uses
//! the same line grammar and block rules as agents.txt, with a single block
//! kind (`Agent:`).
//!
//! ```text
//! Site-Name: Example Blog
//! Site-URL: https://blog.example.com
//! Training: conditional
//! Training-Allow: /public/*
//! Training-Disallow: /drafts/*
//! License: CC-BY-4.0
//! Attribution: required
//!
//! Agent: GPTBot
//!   Training: deny
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::diagnostics::{Diagnostic, InputError, IssueCode, ParseResult, Sink};
use crate::generate::{text, token, Out};
use crate::grammar::{
    generated_comment, is_absolute_url, is_insecure_url, is_valid_timestamp, is_valid_version,
    sanitize_key, scan_lines, LineKind,
};
use crate::json::{decode, schema_violations, GenerateError};
use crate::limits::ParseOptions;
use crate::parser::{
    push_pattern, rate_limit_or_warn, required_site, rewritten_key, unknown_field,
};
use crate::types::{RateLimit, Site, SPEC_VERSION};
use crate::validation::ValidationReport;

static POLICY_SCHEMA: LazyLock<jsonschema::Validator> = LazyLock::new(|| {
    let schema: Value = serde_json::from_str(include_str!("../schema/ai.schema.json"))
        .expect("invalid ai schema JSON");
    jsonschema::validator_for(&schema).expect("invalid ai schema")
});

const RESERVED_KEYS: &[&str] = &[
    "spec-version",
    "site-name",
    "site-url",
    "site-description",
    "description",
    "contact",
    "privacy-policy",
    "training",
    "training-allow",
    "training-disallow",
    "license",
    "license-url",
    "attribution",
    "agent",
];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Whether content may be used for training.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TrainingMode {
    Allow,
    /// The default when a policy says nothing.
    #[default]
    Deny,
    /// Allowed only on the paths in [`TrainingPolicy::allow`] and not on
    /// those in [`TrainingPolicy::deny`].
    Conditional,
}

impl TrainingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TrainingMode::Allow => "allow",
            TrainingMode::Deny => "deny",
            TrainingMode::Conditional => "conditional",
        }
    }
}

impl fmt::Display for TrainingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrainingMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "allow" => Ok(TrainingMode::Allow),
            "deny" => Ok(TrainingMode::Deny),
            "conditional" => Ok(TrainingMode::Conditional),
            _ => Err(format!(
                "training mode {s:?} must be one of: allow, deny, conditional"
            )),
        }
    }
}

/// Attribution expected when content is reused.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Attribution {
    Required,
    Optional,
    None,
}

impl Attribution {
    pub fn as_str(self) -> &'static str {
        match self {
            Attribution::Required => "required",
            Attribution::Optional => "optional",
            Attribution::None => "none",
        }
    }
}

impl FromStr for Attribution {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "required" => Ok(Attribution::Required),
            "optional" => Ok(Attribution::Optional),
            "none" => Ok(Attribution::None),
            _ => Err(format!(
                "attribution {s:?} must be one of: required, optional, none"
            )),
        }
    }
}

/// Site-wide training rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrainingPolicy {
    #[serde(default)]
    pub mode: TrainingMode,

    /// Path globs open to training. Meaningful only in conditional mode.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deny: Vec<String>,
}

/// Per-agent overrides of the site-wide policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgentTrainingPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training: Option<TrainingMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimit>,
}

/// An ai.txt manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDocument {
    pub spec_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,

    pub site: Site,

    #[serde(default)]
    pub training: TrainingPolicy,

    /// SPDX identifier or free-text license name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<Attribution>,

    #[serde(default)]
    pub agents: IndexMap<String, AgentTrainingPolicy>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, String>,
}

impl PolicyDocument {
    pub fn new(site: Site) -> Self {
        Self {
            spec_version: SPEC_VERSION.to_string(),
            generated_at: None,
            site,
            training: TrainingPolicy::default(),
            license: None,
            license_url: None,
            attribution: None,
            agents: IndexMap::new(),
            metadata: IndexMap::new(),
        }
    }

    /// Stamp `generated_at` with the current UTC time.
    pub fn stamped_now(mut self) -> Self {
        self.generated_at =
            Some(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true));
        self
    }

    /// The training mode that applies to `agent`: its own override if it has
    /// one (matched case-insensitively), otherwise the site-wide mode.
    pub fn training_for(&self, agent: &str) -> TrainingMode {
        self.agents
            .get(agent)
            .or_else(|| {
                self.agents
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(agent))
                    .map(|(_, p)| p)
            })
            .or_else(|| self.agents.get(crate::types::WILDCARD_AGENT))
            .and_then(|p| p.training)
            .unwrap_or(self.training.mode)
    }
}

// ---------------------------------------------------------------------------
// Text parser
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
enum Block {
    #[default]
    None,
    Agent {
        name: String,
        line: usize,
        policy: AgentTrainingPolicy,
    },
}

#[derive(Default)]
struct PolicyParser {
    sink: Sink,
    block: Block,
    spec_version: Option<String>,
    generated_at: Option<String>,
    site_name: Option<(String, usize)>,
    site_url: Option<(String, usize)>,
    description: Option<String>,
    contact: Option<String>,
    privacy_policy: Option<String>,
    training: TrainingPolicy,
    license: Option<String>,
    license_url: Option<String>,
    attribution: Option<Attribution>,
    agents: IndexMap<String, AgentTrainingPolicy>,
    metadata: IndexMap<String, String>,
}

/// Parse the text form of an ai.txt manifest.
pub fn parse_policy(
    input: &str,
    options: &ParseOptions,
) -> Result<ParseResult<PolicyDocument>, InputError> {
    options.check_size(input)?;

    let mut p = PolicyParser::default();
    for line in scan_lines(input) {
        let number = line.number;
        match line.kind {
            LineKind::Blank => {}
            LineKind::Comment(c) => {
                if p.generated_at.is_none() {
                    p.generated_at = generated_comment(c)
                        .filter(|ts| is_valid_timestamp(ts))
                        .map(str::to_string);
                }
            }
            LineKind::Malformed { text, indented } => {
                if !indented {
                    p.flush();
                }
                p.sink.warn(
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
            } => p.agent_field(key, value, number),
            LineKind::Field {
                key,
                value,
                indented: false,
            } => {
                p.flush();
                p.top_level(key, value, number);
            }
        }
    }
    p.flush();
    Ok(p.finish())
}

impl PolicyParser {
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
            "site-description" | "description" => self.description = Some(value.to_string()),
            "contact" => self.contact = Some(value.to_string()),
            "privacy-policy" => self.privacy_policy = Some(value.to_string()),
            "training" => {
                if let Some(mode) = self.mode_or_warn(value, line) {
                    self.training.mode = mode;
                }
            }
            "training-allow" => push_pattern(&mut self.training.allow, value),
            "training-disallow" => push_pattern(&mut self.training.deny, value),
            "license" => self.license = Some(value.to_string()),
            "license-url" => self.license_url = Some(value.to_string()),
            "attribution" => match value.parse() {
                Ok(a) => self.attribution = Some(a),
                Err(msg) => self
                    .sink
                    .warn(Diagnostic::new(IssueCode::InvalidValue, msg).at_line(line)),
            },
            "agent" => {
                if value.is_empty() {
                    self.sink.warn(
                        Diagnostic::new(IssueCode::InvalidValue, "Agent requires a name or `*`")
                            .at_line(line),
                    );
                    return;
                }
                self.block = Block::Agent {
                    name: value.to_string(),
                    line,
                    policy: AgentTrainingPolicy::default(),
                };
            }
            _ => {
                if let Some(d) = rewritten_key(key, line) {
                    self.sink.warn(d);
                }
                self.metadata.insert(key.to_string(), value.to_string());
            }
        }
    }

    fn agent_field(&mut self, key: &str, value: &str, line: usize) {
        let lowered = key.to_ascii_lowercase();
        let training = if lowered == "training" {
            Some(self.mode_or_warn(value, line))
        } else {
            None
        };

        let Block::Agent { name, policy, .. } = &mut self.block else {
            self.sink.warn(
                Diagnostic::new(
                    IssueCode::OrphanField,
                    format!("indented field {key:?} is not inside an Agent block"),
                )
                .at_line(line),
            );
            return;
        };
        match lowered.as_str() {
            "training" => policy.training = training.flatten(),
            "rate-limit" => policy.rate_limit = rate_limit_or_warn(value, line, &mut self.sink),
            _ => self
                .sink
                .warn(unknown_field(key, &format!("agent {name:?}"), line)),
        }
    }

    fn mode_or_warn(&mut self, value: &str, line: usize) -> Option<TrainingMode> {
        match value.parse() {
            Ok(mode) => Some(mode),
            Err(msg) => {
                self.sink
                    .warn(Diagnostic::new(IssueCode::InvalidValue, msg).at_line(line));
                None
            }
        }
    }

    fn flush(&mut self) {
        if let Block::Agent { name, line, policy } = std::mem::take(&mut self.block) {
            if self.agents.contains_key(&name) {
                self.sink.warn(
                    Diagnostic::new(
                        IssueCode::DuplicateAgent,
                        format!("agent {name:?} is declared more than once; the later block wins"),
                    )
                    .at_line(line),
                );
            }
            self.agents.insert(name, policy);
        }
    }

    fn finish(mut self) -> ParseResult<PolicyDocument> {
        let Some((name, url)) =
            required_site(self.site_name.take(), self.site_url.take(), &mut self.sink)
        else {
            return self.sink.finish(None);
        };
        let doc = PolicyDocument {
            spec_version: self.spec_version.unwrap_or_else(|| SPEC_VERSION.to_string()),
            generated_at: self.generated_at,
            site: Site {
                name,
                url,
                description: self.description,
                contact: self.contact,
                privacy_policy: self.privacy_policy,
            },
            training: self.training,
            license: self.license,
            license_url: self.license_url,
            attribution: self.attribution,
            agents: self.agents,
            metadata: self.metadata,
        };
        self.sink.finish(Some(doc))
    }
}

// ---------------------------------------------------------------------------
// Text generator
// ---------------------------------------------------------------------------

/// Render `doc` as ai.txt.
pub fn generate_policy(doc: &PolicyDocument) -> String {
    let mut out = Out::default();

    out.comment("ai.txt");
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

    out.blank();
    out.field("Training", doc.training.mode.as_str());
    for pattern in &doc.training.allow {
        out.field("Training-Allow", &token(pattern));
    }
    for pattern in &doc.training.deny {
        out.field("Training-Disallow", &token(pattern));
    }
    if let Some(license) = &doc.license {
        out.field("License", &text(license));
    }
    if let Some(url) = &doc.license_url {
        out.field("License-URL", &token(url));
    }
    if let Some(attribution) = doc.attribution {
        out.field("Attribution", attribution.as_str());
    }

    for (name, policy) in &doc.agents {
        out.blank();
        out.field("Agent", &text(name));
        if let Some(mode) = policy.training {
            out.indented("Training", mode.as_str());
        }
        if let Some(limit) = &policy.rate_limit {
            out.indented("Rate-Limit", &limit.to_string());
        }
    }

    let metadata: Vec<(String, String)> = doc
        .metadata
        .iter()
        .map(|(k, v)| (sanitize_key(k), text(v)))
        .filter(|(k, _)| {
            !k.is_empty() && !RESERVED_KEYS.iter().any(|r| r.eq_ignore_ascii_case(k))
        })
        .collect();
    if !metadata.is_empty() {
        out.blank();
        for (key, value) in &metadata {
            out.field(key, value);
        }
    }

    out.finish()
}

// ---------------------------------------------------------------------------
// JSON form
// ---------------------------------------------------------------------------

/// Parse ai.json.
pub fn parse_policy_json(
    input: &str,
    options: &ParseOptions,
) -> Result<ParseResult<PolicyDocument>, InputError> {
    options.check_size(input)?;

    let value = match decode(input) {
        Ok(value) => value,
        Err(d) => return Ok(ParseResult::failure(d)),
    };
    let violations = schema_violations(&POLICY_SCHEMA, &value);
    if !violations.is_empty() {
        return Ok(ParseResult::from_parts(None, violations, Vec::new()));
    }

    let doc: PolicyDocument = match serde_json::from_value(value) {
        Ok(doc) => doc,
        Err(e) => {
            return Ok(ParseResult::failure(Diagnostic::new(
                IssueCode::SchemaViolation,
                e.to_string(),
            )))
        }
    };

    let mut sink = Sink::default();
    if !is_absolute_url(&doc.site.url) {
        sink.error(site_url_error(&doc.site.url));
    }
    Ok(sink.finish(Some(doc)))
}

/// Serialize a policy as pretty-printed ai.json, schema-checked first.
pub fn generate_policy_json(doc: &PolicyDocument) -> Result<String, GenerateError> {
    let value = serde_json::to_value(doc)?;
    let mut problems = schema_violations(&POLICY_SCHEMA, &value);
    if !is_absolute_url(&doc.site.url) {
        problems.push(site_url_error(&doc.site.url));
    }
    if !problems.is_empty() {
        return Err(GenerateError::Schema(problems));
    }
    Ok(serde_json::to_string_pretty(&value)?)
}

fn site_url_error(url: &str) -> Diagnostic {
    Diagnostic::new(
        IssueCode::InvalidUrl,
        format!("site URL {url:?} is not an absolute URL"),
    )
    .at_field("site.url")
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// Advisory checks over a policy. Policies have no cross-references, so
/// the report only ever carries warnings.
pub fn validate_policy(doc: &PolicyDocument) -> ValidationReport {
    let mut warnings = Vec::new();

    let has_paths = !doc.training.allow.is_empty() || !doc.training.deny.is_empty();
    if has_paths && doc.training.mode != TrainingMode::Conditional {
        warnings.push(
            Diagnostic::new(
                IssueCode::TrainingPathsIgnored,
                format!(
                    "training path rules only apply in conditional mode; mode is {}",
                    doc.training.mode
                ),
            )
            .at_field("training"),
        );
    }

    for (url, field) in [
        (Some(&doc.site.url), "site.url"),
        (doc.license_url.as_ref(), "licenseUrl"),
    ] {
        if let Some(url) = url.filter(|u| is_insecure_url(u)) {
            warnings.push(
                Diagnostic::new(IssueCode::InsecureUrl, format!("{url:?} does not use https"))
                    .at_field(field),
            );
        }
    }

    ValidationReport::from_parts(Vec::new(), warnings)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
