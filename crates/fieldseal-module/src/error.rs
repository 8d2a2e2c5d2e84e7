//! Module runtime error types.
//!
//! Every error variant carries enough context to diagnose the problem
//! without a debugger. Payloads passed to or returned from a module are never
//! included, since they may be plaintext secrets.

/// Errors that can occur while loading or calling a cipher module.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    /// The module could not be fetched, compiled, or instantiated.
    #[error("failed to load module from {source_desc}: {reason}")]
    Load { source_desc: String, reason: String },

    /// The module was loaded but a call into it did not complete.
    #[error("module call '{operation}' failed: {reason}")]
    Invoke { operation: String, reason: String },

    /// The requested runtime is not compiled into this build.
    #[error("module runtime '{name}' is not enabled in this build")]
    Unsupported { name: String },
}
