//! In-process module runtime.
//!
//! Runs a Rust closure in place of a sandboxed module. There is no isolation
//! and nothing is loaded. Use this for unit and integration tests that need
//! a real [`ModuleRuntime`] without a compiled WebAssembly file, or to embed
//! a native cipher behind the same contract.

use crate::{Invocation, ModuleError, ModuleRuntime};

type Handler = Box<dyn FnMut(&str, &[u8]) -> Result<Invocation, ModuleError> + Send>;

/// A [`ModuleRuntime`] backed by a closure.
///
/// # Examples
///
/// ```
/// # use fieldseal_module::{InProcessRuntime, Invocation, ModuleRuntime};
/// let mut runtime = InProcessRuntime::new("reverse", |_op, payload| {
///     let mut out = payload.to_vec();
///     out.reverse();
///     Ok(Invocation::ok(out))
/// });
/// let result = runtime.invoke("Encode", b"abc").unwrap();
/// assert_eq!(result.output, b"cba");
/// ```
pub struct InProcessRuntime {
    name: String,
    handler: Handler,
    calls: usize,
}

impl InProcessRuntime {
    /// Create a runtime that forwards every invocation to `handler`.
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: FnMut(&str, &[u8]) -> Result<Invocation, ModuleError> + Send + 'static,
    {
        Self {
            name: name.into(),
            handler: Box::new(handler),
            calls: 0,
        }
    }

    /// Number of invocations made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl ModuleRuntime for InProcessRuntime {
    fn invoke(&mut self, operation: &str, payload: &[u8]) -> Result<Invocation, ModuleError> {
        self.calls = self.calls.saturating_add(1);
        (self.handler)(operation, payload)
    }

    fn describe(&self) -> String {
        format!("in-process '{}'", self.name)
    }
}

impl std::fmt::Debug for InProcessRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InProcessRuntime")
            .field("name", &self.name)
            .field("calls", &self.calls)
            .finish_non_exhaustive()
    }
}
