//! Pre-rendered response bodies.
//!
//! A manifest is parsed, validated and rendered to both wire forms once at
//! startup. Handlers only clone `Arc`'d strings.

use std::path::Path;

use agentstxt::{
    generate_json, generate_policy, generate_policy_json, generate_text, parse_json,
    parse_policy, parse_policy_json, parse_text, validate, validate_policy, Diagnostic, Document,
    InputError, ParseOptions, ParseResult, PolicyDocument, ValidationReport,
};

use crate::error::ServerError;

/// Both renderings of one document.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub text: String,
    pub json: String,
}

/// Everything the router serves.
#[derive(Debug, Clone)]
pub struct ServedManifest {
    pub agents: Rendered,
    /// The ai.txt policy; its routes exist only when this is set.
    pub policy: Option<Rendered>,
}

impl ServedManifest {
    pub fn from_document(doc: &Document) -> Result<Self, ServerError> {
        Ok(Self {
            agents: Rendered {
                text: generate_text(doc),
                json: generate_json(doc)?,
            },
            policy: None,
        })
    }

    pub fn with_policy(mut self, policy: &PolicyDocument) -> Result<Self, ServerError> {
        self.policy = Some(Rendered {
            text: generate_policy(policy),
            json: generate_policy_json(policy)?,
        });
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Read, parse and validate an agents.txt or agents.json file.
///
/// A `.json` extension selects the JSON parser; anything else is read as
/// text. Parse errors and validation errors both refuse the file. Warnings
/// are logged and the document is returned.
pub fn load_manifest(path: &Path) -> Result<Document, ServerError> {
    let input = read(path)?;
    let parsed = if is_json(path) {
        parse_json(&input, &ParseOptions::default())
    } else {
        parse_text(&input, &ParseOptions::default())
    };
    accept(path, parsed, validate)
}

/// Read, parse and validate an ai.txt or ai.json file.
pub fn load_policy(path: &Path) -> Result<PolicyDocument, ServerError> {
    let input = read(path)?;
    let parsed = if is_json(path) {
        parse_policy_json(&input, &ParseOptions::default())
    } else {
        parse_policy(&input, &ParseOptions::default())
    };
    accept(path, parsed, validate_policy)
}

fn read(path: &Path) -> Result<String, ServerError> {
    std::fs::read_to_string(path).map_err(|source| ServerError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn accept<T>(
    path: &Path,
    parsed: Result<ParseResult<T>, InputError>,
    check: fn(&T) -> ValidationReport,
) -> Result<T, ServerError> {
    let parsed = parsed.map_err(|source| ServerError::Input {
        path: path.to_path_buf(),
        source,
    })?;
    let invalid = |diagnostics: Vec<Diagnostic>| ServerError::Invalid {
        path: path.to_path_buf(),
        diagnostics,
    };

    let (doc, warnings) = parsed.into_result().map_err(invalid)?;
    log_warnings(path, &warnings);

    let report = check(&doc);
    if !report.valid {
        return Err(invalid(report.errors));
    }
    log_warnings(path, &report.warnings);
    Ok(doc)
}

fn log_warnings(path: &Path, warnings: &[Diagnostic]) {
    for w in warnings {
        tracing::warn!("{}: {w}", path.display());
    }
}
