//! Startup errors.
//!
//! Requests themselves cannot fail once the manifest is loaded: every
//! response body is rendered up front. Only loading can go wrong.

use std::path::PathBuf;

use agentstxt::{Diagnostic, GenerateError, InputError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}: {source}", .path.display())]
    Input { path: PathBuf, source: InputError },

    /// The file parsed or validated with errors; nothing is served.
    #[error("{} has {} error(s): {}", .path.display(), .diagnostics.len(), summary(.diagnostics))]
    Invalid {
        path: PathBuf,
        diagnostics: Vec<Diagnostic>,
    },

    #[error("cannot render manifest: {0}")]
    Render(#[from] GenerateError),
}

fn summary(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
