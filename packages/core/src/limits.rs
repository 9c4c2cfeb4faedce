//! Resource bounds applied by the parsers.
//!
//! Limits are always passed in by the caller; nothing here is global.

/// Default maximum manifest size accepted by the parsers (512 KiB).
pub const DEFAULT_MAX_BYTES: usize = 512 * 1024;

/// Default ceiling on the number of capabilities in one manifest.
pub const DEFAULT_MAX_CAPABILITIES: usize = 500;

/// Maximum length of a site name, in characters.
pub const MAX_SITE_NAME_LEN: usize = 200;

/// Bounds for a single parse call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Inputs longer than this many bytes are rejected before scanning.
    pub max_bytes: usize,
    /// Manifests declaring more capabilities than this fail with
    /// `LIMIT_EXCEEDED`.
    pub max_capabilities: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            max_capabilities: DEFAULT_MAX_CAPABILITIES,
        }
    }
}

impl ParseOptions {
    pub(crate) fn check_size(&self, input: &str) -> Result<(), crate::InputError> {
        if input.len() > self.max_bytes {
            return Err(crate::InputError::TooLarge {
                size: input.len(),
                max: self.max_bytes,
            });
        }
        Ok(())
    }
}
