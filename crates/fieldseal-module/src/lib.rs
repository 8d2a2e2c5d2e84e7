//! Cipher module runtime abstraction for `fieldseal`.
//!
//! This crate defines the [`ModuleRuntime`] trait, the synchronous boundary
//! between `fieldseal` and a sandboxed cipher module. A runtime knows nothing
//! about documents, patterns, or resource types: it is handed an operation
//! name and an opaque payload, and returns an exit status plus an output
//! payload.
//!
//! Two implementations are provided:
//!
//! - [`WasmRuntime`]: production default, runs a WebAssembly module through
//!   Extism with WASI enabled (feature `wasm-runtime`)
//! - [`InProcessRuntime`]: wraps a Rust closure, for testing and embedding

mod error;
mod in_process;
#[cfg(feature = "wasm-runtime")]
mod wasm;

use std::path::PathBuf;

pub use error::ModuleError;
pub use in_process::InProcessRuntime;
#[cfg(feature = "wasm-runtime")]
pub use wasm::WasmRuntime;

/// Operation name the module exports for encoding a single value.
pub const ENCODE_OPERATION: &str = "Encode";

/// Operation name the module exports for decoding a single value.
pub const DECODE_OPERATION: &str = "Decode";

/// Result of a single module invocation.
///
/// A zero `status` means success. Any other value is a module-reported
/// failure; `output` may then carry a diagnostic payload or be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Exit status reported by the module.
    pub status: i32,
    /// Raw output payload.
    pub output: Vec<u8>,
}

impl Invocation {
    /// A successful invocation carrying `output`.
    #[must_use]
    pub fn ok(output: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 0,
            output: output.into(),
        }
    }

    /// A failed invocation with the given non-zero status and no output.
    #[must_use]
    pub fn failed(status: i32) -> Self {
        Self {
            status,
            output: Vec::new(),
        }
    }

    /// Whether the module reported success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == 0
    }
}

/// Where a cipher module is loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSource {
    /// A module file on the local filesystem.
    File(PathBuf),
    /// A module fetched over HTTP(S) once, at load time.
    Url(String),
}

impl std::fmt::Display for ModuleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "file '{}'", path.display()),
            Self::Url(url) => write!(f, "url '{url}'"),
        }
    }
}

/// A loaded, ready-to-call cipher module.
///
/// Invocations are synchronous and run on the calling thread. Implementations
/// are not internally synchronized: `invoke` takes `&mut self`, so callers
/// that share one runtime between threads must serialize access themselves
/// (e.g. behind a `Mutex`).
pub trait ModuleRuntime: Send {
    /// Call the exported `operation` with `payload`.
    ///
    /// A module that runs to completion and reports a non-zero status is
    /// *not* an `Err`; it is returned as an [`Invocation`] so the caller can
    /// decide what the status means.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::Invoke`] if the call could not be completed
    /// (missing export, trap, host failure).
    fn invoke(&mut self, operation: &str, payload: &[u8]) -> Result<Invocation, ModuleError>;

    /// Short human-readable description of the runtime, for logs.
    fn describe(&self) -> String;
}
