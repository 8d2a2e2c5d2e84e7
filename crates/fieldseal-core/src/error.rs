//! Error types for `fieldseal-core`.
//!
//! Each error variant carries enough context to diagnose the problem without
//! a debugger. Errors never include field values or module payloads, only
//! the paths and names needed to find the problem.

use fieldseal_module::ModuleError;

/// Errors from parsing a wildcard pattern.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    /// The pattern string was empty.
    #[error("wildcard pattern is empty")]
    Empty,

    /// A segment between two dots was empty (e.g. `a..b` or a trailing dot).
    #[error("wildcard pattern '{pattern}' has an empty segment at position {position}")]
    EmptySegment { pattern: String, position: usize },
}

/// Errors from cipher backends and the document transformer.
#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    /// The cipher module could not be loaded. Fatal where a cipher was
    /// explicitly required; the embedding application decides how to exit.
    #[error("cipher module unavailable: {reason}")]
    ModuleLoad { reason: String },

    /// A call into the cipher module did not complete.
    #[error("cipher {operation} failed: {reason}")]
    Invocation { operation: String, reason: String },

    /// The cipher module completed but reported a non-zero status.
    #[error("cipher module returned non-zero status {status}, failed to {operation}")]
    ModuleStatus { operation: String, status: i32 },

    /// The cipher module returned bytes that are not valid UTF-8.
    #[error("cipher {operation} produced non-UTF-8 output")]
    InvalidOutput { operation: String },

    /// The document handed to `encode`/`decode` is not valid UTF-8 JSON.
    #[error("invalid {resource} document: {reason}")]
    InvalidDocument { resource: String, reason: String },
}

impl From<ModuleError> for CipherError {
    fn from(err: ModuleError) -> Self {
        match err {
            ModuleError::Load { .. } | ModuleError::Unsupported { .. } => Self::ModuleLoad {
                reason: err.to_string(),
            },
            ModuleError::Invoke { operation, reason } => Self::Invocation { operation, reason },
        }
    }
}

/// Errors from loading settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("failed to read settings file '{path}': {reason}")]
    Read { path: String, reason: String },

    /// The settings file is not valid YAML for the expected shape.
    #[error("failed to parse settings file '{path}': {reason}")]
    Parse { path: String, reason: String },

    /// A registered secure-field pattern is malformed.
    #[error("invalid pattern for resource '{resource}': {source}")]
    Pattern {
        resource: String,
        #[source]
        source: PatternError,
    },
}
