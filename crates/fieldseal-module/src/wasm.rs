//! WebAssembly module runtime, the production default.
//!
//! Wraps an Extism [`Plugin`] behind the [`ModuleRuntime`] trait. The module
//! is fetched (for URLs) and compiled exactly once, in [`WasmRuntime::load`];
//! every later call reuses the same instance. WASI is enabled so modules can
//! read their configuration and use a random source.
//!
//! Configuration handed to `load` is exposed to the module through Extism's
//! config API. Indirection (`env:` / `file:` values) is resolved by the
//! caller before this point; this layer passes strings through verbatim.

use std::collections::BTreeMap;

use extism::{Manifest, Plugin, Wasm};
use tracing::{debug, info};

use crate::{Invocation, ModuleError, ModuleRuntime, ModuleSource};

/// Status Extism returns when a call fails on the host side.
const HOST_FAILURE: i32 = -1;

/// A cipher module running inside the Extism WebAssembly sandbox.
pub struct WasmRuntime {
    plugin: Plugin,
    source: ModuleSource,
}

impl WasmRuntime {
    /// Fetch, compile, and instantiate the module at `source`.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::Load`] if the module cannot be read, downloaded,
    /// compiled, or instantiated.
    pub fn load(
        source: &ModuleSource,
        config: &BTreeMap<String, String>,
    ) -> Result<Self, ModuleError> {
        let wasm = match source {
            ModuleSource::File(path) => Wasm::file(path),
            ModuleSource::Url(url) => Wasm::url(url.clone()),
        };

        let manifest = Manifest::new([wasm])
            .with_config(config.iter().map(|(k, v)| (k.clone(), v.clone())));

        debug!(source = %source, config_keys = config.len(), "instantiating cipher module");

        let plugin = Plugin::new(&manifest, [], true).map_err(|e| ModuleError::Load {
            source_desc: source.to_string(),
            reason: e.to_string(),
        })?;

        info!(source = %source, "cipher module loaded");

        Ok(Self {
            plugin,
            source: source.clone(),
        })
    }
}

impl ModuleRuntime for WasmRuntime {
    fn invoke(&mut self, operation: &str, payload: &[u8]) -> Result<Invocation, ModuleError> {
        match self
            .plugin
            .call_get_error_code::<&[u8], Vec<u8>>(operation, payload)
        {
            Ok(output) => Ok(Invocation::ok(output)),
            // Extism reports host-side failures (missing export, trap,
            // instantiation, fuel) as -1; other non-zero codes come from the guest.
            Err((e, code)) if code != 0 && code != HOST_FAILURE => {
                debug!(operation, status = code, "cipher module returned failure status");
                Ok(Invocation {
                    status: code,
                    output: e.to_string().into_bytes(),
                })
            }
            Err((e, _)) => Err(ModuleError::Invoke {
                operation: operation.to_owned(),
                reason: e.to_string(),
            }),
        }
    }

    fn describe(&self) -> String {
        format!("wasm {}", self.source)
    }
}

impl std::fmt::Debug for WasmRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmRuntime")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
