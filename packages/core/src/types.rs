//! Core data types for the agents.txt manifest format.
//!
//! This module defines the structured document that both wire forms decode
//! into: [`Document`], [`Site`], [`Capability`], [`AuthConfig`],
//! [`RateLimit`], [`ParameterDef`], [`AgentPolicy`], and [`AccessControl`].
//! All types serialise to and from the camelCase JSON form of the manifest.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The `major.minor` version tag written by this implementation.
pub const SPEC_VERSION: &str = "1.0";

/// Catch-all access pattern substituted when a manifest declares no `Allow`.
pub const ALLOW_ALL: &str = "*";

/// Agent name that matches every caller without a more specific policy.
pub const WILDCARD_AGENT: &str = "*";

/// The transport protocol a capability speaks.
///
/// The set is closed by the format, but values outside it are kept verbatim
/// in [`Protocol::Other`] so that newer manifests still parse. Parsers emit a
/// warning whenever they produce `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Protocol {
    #[default]
    Rest,
    Mcp,
    A2a,
    GraphQl,
    WebSocket,
    Other(String),
}

impl Protocol {
    /// The wire-format spelling (e.g. `"GraphQL"`).
    pub fn as_str(&self) -> &str {
        match self {
            Protocol::Rest => "REST",
            Protocol::Mcp => "MCP",
            Protocol::A2a => "A2A",
            Protocol::GraphQl => "GraphQL",
            Protocol::WebSocket => "WebSocket",
            Protocol::Other(s) => s,
        }
    }

    /// Map a wire string onto a protocol. Matching is case-insensitive;
    /// unrecognised values become [`Protocol::Other`].
    pub fn from_wire(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "rest" => Protocol::Rest,
            "mcp" => Protocol::Mcp,
            "a2a" => Protocol::A2a,
            "graphql" => Protocol::GraphQl,
            "websocket" => Protocol::WebSocket,
            _ => Protocol::Other(s.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Protocol::Other(_))
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Protocol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Protocol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Protocol::from_wire(&s))
    }
}

/// How callers authenticate against a capability.
///
/// Like [`Protocol`], unknown schemes are preserved in [`AuthType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum AuthType {
    #[default]
    None,
    ApiKey,
    BearerToken,
    OAuth2,
    Hmac,
    Other(String),
}

impl AuthType {
    pub fn as_str(&self) -> &str {
        match self {
            AuthType::None => "none",
            AuthType::ApiKey => "api-key",
            AuthType::BearerToken => "bearer-token",
            AuthType::OAuth2 => "oauth2",
            AuthType::Hmac => "hmac",
            AuthType::Other(s) => s,
        }
    }

    pub fn from_wire(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "none" => AuthType::None,
            "api-key" => AuthType::ApiKey,
            "bearer-token" => AuthType::BearerToken,
            "oauth2" => AuthType::OAuth2,
            "hmac" => AuthType::Hmac,
            _ => AuthType::Other(s.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, AuthType::Other(_))
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AuthType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AuthType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(AuthType::from_wire(&s))
    }
}

/// The time unit of a [`RateLimit`].
///
/// Serialises as a lowercase string (e.g. `"minute"`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    Second,
    Minute,
    Hour,
    Day,
}

impl Window {
    pub fn as_str(self) -> &'static str {
        match self {
            Window::Second => "second",
            Window::Minute => "minute",
            Window::Hour => "hour",
            Window::Day => "day",
        }
    }

    /// Length of the window in seconds.
    pub fn seconds(self) -> u64 {
        match self {
            Window::Second => 1,
            Window::Minute => 60,
            Window::Hour => 3_600,
            Window::Day => 86_400,
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a [`Window`] from its lowercase wire-format string.
impl FromStr for Window {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "second" => Ok(Window::Second),
            "minute" => Ok(Window::Minute),
            "hour" => Ok(Window::Hour),
            "day" => Ok(Window::Day),
            _ => Err(format!(
                "unknown rate-limit window {:?}; expected one of: second, minute, hour, day",
                s
            )),
        }
    }
}

/// A request budget: `requests` calls per `window`.
///
/// The canonical string form is `<N>/<window>`, e.g. `100/minute`. In JSON
/// it is an object: `{ "requests": 100, "window": "minute" }`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RateLimit {
    /// Strictly positive request count.
    pub requests: u32,
    pub window: Window,
}

impl RateLimit {
    pub fn new(requests: u32, window: Window) -> Self {
        Self { requests, window }
    }
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.requests, self.window)
    }
}

/// Parses the canonical `<N>/<window>` form. See [`crate::grammar::parse_rate_limit`].
impl FromStr for RateLimit {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::grammar::parse_rate_limit(s)
    }
}

/// Where a parameter is carried in the request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Query,
    Path,
    Header,
    Body,
}

impl Location {
    pub fn as_str(self) -> &'static str {
        match self {
            Location::Query => "query",
            Location::Path => "path",
            Location::Header => "header",
            Location::Body => "body",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Location {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query" => Ok(Location::Query),
            "path" => Ok(Location::Path),
            "header" => Ok(Location::Header),
            "body" => Ok(Location::Body),
            _ => Err(format!(
                "unknown parameter location {:?}; expected one of: query, path, header, body",
                s
            )),
        }
    }
}

/// One input accepted by a capability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParameterDef {
    pub name: String,

    #[serde(rename = "in")]
    pub location: Location,

    /// Free-text type token (`string`, `integer`, `date-time`, ...).
    #[serde(rename = "type")]
    pub param_type: String,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Lower bound for numeric parameters. JSON form only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    /// Upper bound for numeric parameters. JSON form only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// How to authenticate against a capability.
///
/// Never carries a secret: the format has endpoints and documentation links
/// only.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    #[serde(rename = "type")]
    pub auth_type: AuthType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs_url: Option<String>,

    /// OAuth dynamic client registration endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
}

/// One declared callable action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Capability {
    /// Matches `^[a-z0-9][a-z0-9-]*$`; unique within a [`Document`].
    pub id: String,

    #[serde(default)]
    pub description: String,

    pub endpoint: String,

    /// HTTP verb. Absent means `GET`; see [`Capability::effective_method`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    pub protocol: Protocol,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimit>,

    /// URL of an OpenAPI document describing the endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openapi: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParameterDef>,

    /// OAuth scopes required to call this capability.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
}

impl Capability {
    /// A capability with the required fields set and everything else absent.
    pub fn new(
        id: impl Into<String>,
        endpoint: impl Into<String>,
        protocol: Protocol,
    ) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            endpoint: endpoint.into(),
            method: None,
            protocol,
            auth: None,
            rate_limit: None,
            openapi: None,
            params: Vec::new(),
            scopes: Vec::new(),
        }
    }

    pub fn effective_method(&self) -> &str {
        self.method.as_deref().unwrap_or("GET")
    }
}

/// The publishing origin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    /// 1–200 characters.
    pub name: String,

    /// Absolute URL of the origin.
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_policy: Option<String>,
}

impl Site {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            description: None,
            contact: None,
            privacy_policy: None,
        }
    }
}

/// Path-level access rules, as glob patterns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessControl {
    #[serde(default)]
    pub allow: Vec<String>,

    #[serde(default)]
    pub disallow: Vec<String>,
}

impl AccessControl {
    /// Replace an empty `allow` list with the catch-all pattern.
    pub fn normalized(mut self) -> Self {
        if self.allow.is_empty() {
            self.allow.push(ALLOW_ALL.to_string());
        }
        self
    }

    /// True when the rules are exactly the implicit default.
    pub fn is_default(&self) -> bool {
        self.disallow.is_empty() && self.allow.len() == 1 && self.allow[0] == ALLOW_ALL
    }
}

impl Default for AccessControl {
    fn default() -> Self {
        Self {
            allow: vec![ALLOW_ALL.to_string()],
            disallow: Vec::new(),
        }
    }
}

/// Per-agent overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimit>,

    /// Capability ids this agent may call. `None` permits all of them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Vec<String>>,
}

impl AgentPolicy {
    /// A list holding only `*` means "all", the same as no list.
    pub fn normalized(self) -> Self {
        let all = self
            .capabilities
            .as_deref()
            .is_some_and(|ids| matches!(ids, [only] if only == WILDCARD_AGENT));
        if all {
            Self {
                capabilities: None,
                ..self
            }
        } else {
            self
        }
    }

    pub fn permits(&self, capability_id: &str) -> bool {
        match &self.capabilities {
            None => true,
            Some(ids) => ids.iter().any(|id| id == capability_id),
        }
    }
}

/// An agents.txt manifest: the root artifact of the format.
///
/// A document is built once per parse and then only read: the validator and
/// both generators take `&Document`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// `major.minor`.
    pub spec_version: String,

    /// RFC 3339 timestamp of generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,

    pub site: Site,

    #[serde(default)]
    pub capabilities: Vec<Capability>,

    #[serde(default)]
    pub access: AccessControl,

    /// Agent name → policy, in declaration order.
    #[serde(default)]
    pub agents: IndexMap<String, AgentPolicy>,

    /// Unrecognised top-level fields, preserved verbatim.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, String>,
}

impl Document {
    /// An empty manifest for `site`.
    pub fn new(site: Site) -> Self {
        Self {
            spec_version: SPEC_VERSION.to_string(),
            generated_at: None,
            site,
            capabilities: Vec::new(),
            access: AccessControl::default(),
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

    pub fn capability(&self, id: &str) -> Option<&Capability> {
        self.capabilities.iter().find(|c| c.id == id)
    }

    /// Resolve the policy that applies to `agent`.
    ///
    /// An exact key wins, then an ASCII case-insensitive match, then the
    /// `*` wildcard.
    pub fn agent_policy(&self, agent: &str) -> Option<&AgentPolicy> {
        self.agents
            .get(agent)
            .or_else(|| {
                self.agents
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(agent))
                    .map(|(_, p)| p)
            })
            .or_else(|| self.agents.get(WILDCARD_AGENT))
    }
}
