//! Errors and warnings produced while reading or checking a manifest.
//!
//! Malformed *content* never becomes a Rust error. Parsers and the validator
//! return [`Diagnostic`] values inside a [`ParseResult`] or
//! [`ValidationReport`](crate::validation::ValidationReport); only caller
//! misuse (for example oversized input, see [`InputError`]) is an `Err`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Whether a diagnostic blocks acceptance of the document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// The failure class a diagnostic belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// The bytes could not be read as the wire format at all.
    Syntax,
    /// Structural mismatch against the typed shape.
    Schema,
    /// Cross-field inconsistency (duplicate id, dangling reference).
    Semantic,
    /// Usable but imperfect.
    Advisory,
    /// No manifest could be fetched.
    Discovery,
}

/// Machine-readable diagnostic code.
///
/// Serialises as SCREAMING_SNAKE_CASE (e.g. `"DUPLICATE_CAPABILITY"`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    // syntax
    InvalidJson,
    MalformedLine,
    OrphanField,
    // schema
    MissingField,
    InvalidField,
    InvalidId,
    InvalidUrl,
    SchemaViolation,
    LimitExceeded,
    // semantic
    DuplicateCapability,
    UnknownCapability,
    // advisory
    InvalidValue,
    UnknownField,
    UnknownProtocol,
    UnknownAuthType,
    UnknownMethod,
    InvalidRateLimit,
    InvalidParam,
    InvalidVersion,
    InvalidTimestamp,
    DuplicateAgent,
    DefaultApplied,
    InsecureUrl,
    EmptyCapabilityList,
    TrainingPathsIgnored,
    // discovery
    DiscoveryFailed,
}

impl IssueCode {
    pub const ALL: &'static [IssueCode] = &[
        IssueCode::InvalidJson,
        IssueCode::MalformedLine,
        IssueCode::OrphanField,
        IssueCode::MissingField,
        IssueCode::InvalidField,
        IssueCode::InvalidId,
        IssueCode::InvalidUrl,
        IssueCode::SchemaViolation,
        IssueCode::LimitExceeded,
        IssueCode::DuplicateCapability,
        IssueCode::UnknownCapability,
        IssueCode::InvalidValue,
        IssueCode::UnknownField,
        IssueCode::UnknownProtocol,
        IssueCode::UnknownAuthType,
        IssueCode::UnknownMethod,
        IssueCode::InvalidRateLimit,
        IssueCode::InvalidParam,
        IssueCode::InvalidVersion,
        IssueCode::InvalidTimestamp,
        IssueCode::DuplicateAgent,
        IssueCode::DefaultApplied,
        IssueCode::InsecureUrl,
        IssueCode::EmptyCapabilityList,
        IssueCode::TrainingPathsIgnored,
        IssueCode::DiscoveryFailed,
    ];

    pub fn kind(self) -> ErrorKind {
        use IssueCode::*;
        match self {
            InvalidJson | MalformedLine | OrphanField => ErrorKind::Syntax,
            MissingField | InvalidField | InvalidId | InvalidUrl | SchemaViolation
            | LimitExceeded => ErrorKind::Schema,
            DuplicateCapability | UnknownCapability => ErrorKind::Semantic,
            DiscoveryFailed => ErrorKind::Discovery,
            _ => ErrorKind::Advisory,
        }
    }

    /// Where the parsers and validator report this code. Malformed or
    /// orphaned text lines degrade to warnings; everything else outside the
    /// advisory class blocks the document.
    pub fn severity(self) -> Severity {
        match self {
            IssueCode::MalformedLine | IssueCode::OrphanField => Severity::Warning,
            code if code.kind() == ErrorKind::Advisory => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// The wire name; matches the serde form.
    pub fn as_str(self) -> &'static str {
        use IssueCode::*;
        match self {
            InvalidJson => "INVALID_JSON",
            MalformedLine => "MALFORMED_LINE",
            OrphanField => "ORPHAN_FIELD",
            MissingField => "MISSING_FIELD",
            InvalidField => "INVALID_FIELD",
            InvalidId => "INVALID_ID",
            InvalidUrl => "INVALID_URL",
            SchemaViolation => "SCHEMA_VIOLATION",
            LimitExceeded => "LIMIT_EXCEEDED",
            DuplicateCapability => "DUPLICATE_CAPABILITY",
            UnknownCapability => "UNKNOWN_CAPABILITY",
            InvalidValue => "INVALID_VALUE",
            UnknownField => "UNKNOWN_FIELD",
            UnknownProtocol => "UNKNOWN_PROTOCOL",
            UnknownAuthType => "UNKNOWN_AUTH_TYPE",
            UnknownMethod => "UNKNOWN_METHOD",
            InvalidRateLimit => "INVALID_RATE_LIMIT",
            InvalidParam => "INVALID_PARAM",
            InvalidVersion => "INVALID_VERSION",
            InvalidTimestamp => "INVALID_TIMESTAMP",
            DuplicateAgent => "DUPLICATE_AGENT",
            DefaultApplied => "DEFAULT_APPLIED",
            InsecureUrl => "INSECURE_URL",
            EmptyCapabilityList => "EMPTY_CAPABILITY_LIST",
            TrainingPathsIgnored => "TRAINING_PATHS_IGNORED",
            DiscoveryFailed => "DISCOVERY_FAILED",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One error or warning, attributed to a line (text form) or a dot-joined
/// field path (JSON form and validator) where possible.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: IssueCode,
    pub message: String,

    /// 1-based line number in the text form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,

    /// Dot-joined field path, e.g. `capabilities.0.endpoint`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl Diagnostic {
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            line: None,
            field: None,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn at_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, &self.field) {
            (Some(line), _) => write!(f, "line {line}: ")?,
            (None, Some(field)) => write!(f, "{field}: ")?,
            (None, None) => {}
        }
        write!(f, "{} [{}]", self.message, self.code)
    }
}

/// The outcome of parsing one manifest.
///
/// Exactly one of two shapes:
/// - success: `document` is `Some`, `errors` is empty;
/// - failure: `document` is `None`, `errors` is non-empty.
///
/// `warnings` may be present in both.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult<T> {
    pub document: Option<T>,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl<T> ParseResult<T> {
    /// Assemble a result, dropping the document whenever errors exist.
    pub fn from_parts(
        document: Option<T>,
        errors: Vec<Diagnostic>,
        warnings: Vec<Diagnostic>,
    ) -> Self {
        let document = if errors.is_empty() { document } else { None };
        Self {
            document,
            errors,
            warnings,
        }
    }

    /// A failure carrying a single error.
    pub fn failure(error: Diagnostic) -> Self {
        Self {
            document: None,
            errors: vec![error],
            warnings: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.document.is_some()
    }

    /// Convert into a `Result`, keeping the warnings on the success side.
    pub fn into_result(self) -> Result<(T, Vec<Diagnostic>), Vec<Diagnostic>> {
        match self.document {
            Some(doc) => Ok((doc, self.warnings)),
            None => Err(self.errors),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ParseResult<U> {
        ParseResult {
            document: self.document.map(f),
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}

/// Caller misuse detected before any parsing work.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("input is {size} bytes, exceeding the {max}-byte limit")]
    TooLarge { size: usize, max: usize },
}

/// Collects diagnostics while a parser runs.
#[derive(Debug, Default)]
pub(crate) struct Sink {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl Sink {
    pub fn error(&mut self, d: Diagnostic) {
        self.errors.push(d);
    }

    pub fn warn(&mut self, d: Diagnostic) {
        self.warnings.push(d);
    }

    pub fn finish<T>(self, document: Option<T>) -> ParseResult<T> {
        ParseResult::from_parts(document, self.errors, self.warnings)
    }
}
