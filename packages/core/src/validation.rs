//! Cross-field checks over a parsed [`Document`].
//!
//! Parsing establishes that each field is well formed on its own; the
//! validator looks at relationships between fields. It never mutates the
//! document and never fails: every finding is a [`Diagnostic`] in the
//! returned [`ValidationReport`].

use std::collections::HashSet;

use serde::Serialize;

use crate::diagnostics::{Diagnostic, IssueCode};
use crate::grammar::{is_insecure_url, is_known_method};
use crate::types::Document;

/// Result of [`validate`].
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ValidationReport {
    /// `true` exactly when `errors` is empty.
    pub valid: bool,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl ValidationReport {
    pub(crate) fn from_parts(errors: Vec<Diagnostic>, warnings: Vec<Diagnostic>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

/// Validate a [`Document`] for semantic consistency.
///
/// Errors, in this order:
/// - `DUPLICATE_CAPABILITY`: one per repeated capability id, in document
///   order;
/// - `UNKNOWN_CAPABILITY`: one per agent reference that names no declared
///   capability, agents in declaration order.
///
/// Warnings: `INSECURE_URL`, `EMPTY_CAPABILITY_LIST`, `UNKNOWN_METHOD`.
pub fn validate(doc: &Document) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    check_duplicate_ids(doc, &mut errors);
    check_agent_references(doc, &mut errors);
    check_insecure_urls(doc, &mut warnings);
    check_empty_agent_lists(doc, &mut warnings);
    check_methods(doc, &mut warnings);

    ValidationReport::from_parts(errors, warnings)
}

fn check_duplicate_ids(doc: &Document, errors: &mut Vec<Diagnostic>) {
    let mut seen = HashSet::new();
    for (i, cap) in doc.capabilities.iter().enumerate() {
        if !seen.insert(cap.id.as_str()) {
            errors.push(
                Diagnostic::new(
                    IssueCode::DuplicateCapability,
                    format!("capability id {:?} is declared more than once", cap.id),
                )
                .at_field(format!("capabilities.{i}.id")),
            );
        }
    }
}

fn check_agent_references(doc: &Document, errors: &mut Vec<Diagnostic>) {
    let declared: HashSet<&str> = doc.capabilities.iter().map(|c| c.id.as_str()).collect();
    for (agent, policy) in &doc.agents {
        let Some(ids) = &policy.capabilities else {
            continue;
        };
        for (i, id) in ids.iter().enumerate() {
            if !declared.contains(id.as_str()) {
                errors.push(
                    Diagnostic::new(
                        IssueCode::UnknownCapability,
                        format!("agent {agent:?} references undeclared capability {id:?}"),
                    )
                    .at_field(format!("agents.{agent}.capabilities.{i}")),
                );
            }
        }
    }
}

fn check_insecure_urls(doc: &Document, warnings: &mut Vec<Diagnostic>) {
    let mut check = |url: &str, field: String| {
        if is_insecure_url(url) {
            warnings.push(
                Diagnostic::new(
                    IssueCode::InsecureUrl,
                    format!("{url:?} does not use https"),
                )
                .at_field(field),
            );
        }
    };

    check(&doc.site.url, "site.url".into());
    for (i, cap) in doc.capabilities.iter().enumerate() {
        check(&cap.endpoint, format!("capabilities.{i}.endpoint"));
        if let Some(openapi) = &cap.openapi {
            check(openapi, format!("capabilities.{i}.openapi"));
        }
        if let Some(auth) = &cap.auth {
            if let Some(url) = &auth.token_endpoint {
                check(url, format!("capabilities.{i}.auth.tokenEndpoint"));
            }
            if let Some(url) = &auth.registration_endpoint {
                check(url, format!("capabilities.{i}.auth.registrationEndpoint"));
            }
        }
    }
}

fn check_empty_agent_lists(doc: &Document, warnings: &mut Vec<Diagnostic>) {
    for (agent, policy) in &doc.agents {
        if policy.capabilities.as_ref().is_some_and(Vec::is_empty) {
            warnings.push(
                Diagnostic::new(
                    IssueCode::EmptyCapabilityList,
                    format!("agent {agent:?} has an empty capability list and may call nothing"),
                )
                .at_field(format!("agents.{agent}.capabilities")),
            );
        }
    }
}

fn check_methods(doc: &Document, warnings: &mut Vec<Diagnostic>) {
    for (i, cap) in doc.capabilities.iter().enumerate() {
        if let Some(method) = &cap.method {
            if !is_known_method(method) {
                warnings.push(
                    Diagnostic::new(
                        IssueCode::UnknownMethod,
                        format!("method {method:?} is not a standard HTTP verb"),
                    )
                    .at_field(format!("capabilities.{i}.method")),
                );
            }
        }
    }
}

// --- tests -------------------------------------------------------------------
