//! Cipher backends.
//!
//! A [`CipherBackend`] encodes and decodes single values, and whole documents
//! by way of the [value transformer](crate::transform). Two backends exist:
//!
//! - [`PassThroughCipher`] returns everything unchanged. Used when no cipher
//!   is configured or plugins are disabled.
//! - [`ModuleCipher`] delegates each value to an external cipher module
//!   through a [`ModuleRuntime`].
//!
//! The backend is chosen once, by [`cipher_from_settings`], and handed to
//! callers as a trait object.

use fieldseal_module::{DECODE_OPERATION, ENCODE_OPERATION, ModuleRuntime};
use tracing::{debug, info};

use crate::error::CipherError;
use crate::registry::FieldRegistry;
use crate::resource::ResourceType;
use crate::settings::PluginSettings;
use crate::transform::{Transformed, transform};

/// Encode/decode contract shared by every cipher backend.
///
/// Methods take `&mut self`: a backend may own a module instance that cannot
/// be called concurrently. Share one across threads behind a `Mutex`.
pub trait CipherBackend: Send {
    /// Short description for logs.
    fn name(&self) -> String;

    /// Encode one value.
    ///
    /// # Errors
    ///
    /// Returns a [`CipherError`] if the backend could not encode `value`.
    fn encode_value(&mut self, value: &str) -> Result<String, CipherError>;

    /// Decode one value.
    ///
    /// # Errors
    ///
    /// Returns a [`CipherError`] if the backend could not decode `value`.
    fn decode_value(&mut self, value: &str) -> Result<String, CipherError>;

    /// Encode every secure field of `document`, with a per-field report.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidDocument`] if `document` is not JSON and
    /// `resource` has registered fields.
    fn encode_document(
        &mut self,
        resource: ResourceType,
        document: &[u8],
    ) -> Result<Transformed, CipherError>;

    /// Decode every secure field of `document`, with a per-field report.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidDocument`] if `document` is not JSON and
    /// `resource` has registered fields.
    fn decode_document(
        &mut self,
        resource: ResourceType,
        document: &[u8],
    ) -> Result<Transformed, CipherError>;

    /// Encode every secure field of `document`.
    ///
    /// # Errors
    ///
    /// See [`encode_document`](Self::encode_document).
    fn encode(&mut self, resource: ResourceType, document: &[u8]) -> Result<Vec<u8>, CipherError> {
        self.encode_document(resource, document).map(|t| t.document)
    }

    /// Decode every secure field of `document`.
    ///
    /// # Errors
    ///
    /// See [`decode_document`](Self::decode_document).
    fn decode(&mut self, resource: ResourceType, document: &[u8]) -> Result<Vec<u8>, CipherError> {
        self.decode_document(resource, document).map(|t| t.document)
    }
}

// ── Pass-through ─────────────────────────────────────────────────────

/// Identity cipher. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughCipher;

impl CipherBackend for PassThroughCipher {
    fn name(&self) -> String {
        "pass-through".to_owned()
    }

    fn encode_value(&mut self, value: &str) -> Result<String, CipherError> {
        Ok(value.to_owned())
    }

    fn decode_value(&mut self, value: &str) -> Result<String, CipherError> {
        Ok(value.to_owned())
    }

    fn encode_document(
        &mut self,
        _resource: ResourceType,
        document: &[u8],
    ) -> Result<Transformed, CipherError> {
        Ok(Transformed::unchanged(document))
    }

    fn decode_document(
        &mut self,
        _resource: ResourceType,
        document: &[u8],
    ) -> Result<Transformed, CipherError> {
        Ok(Transformed::unchanged(document))
    }
}

// ── Module-backed ────────────────────────────────────────────────────

/// Cipher backed by an external module.
///
/// Each value is sent to the module's `Encode` or `Decode` export as UTF-8
/// bytes; a zero status with UTF-8 output is success.
#[derive(Debug)]
pub struct ModuleCipher<R> {
    runtime: R,
    registry: FieldRegistry,
}

impl<R: ModuleRuntime> ModuleCipher<R> {
    /// Wrap a loaded runtime. `registry` selects the fields the document
    /// operations touch.
    pub fn new(runtime: R, registry: FieldRegistry) -> Self {
        Self { runtime, registry }
    }

    /// The registry used by the document operations.
    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    /// The underlying runtime.
    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    fn call(runtime: &mut R, operation: &str, value: &str) -> Result<String, CipherError> {
        let invocation = runtime.invoke(operation, value.as_bytes())?;
        if !invocation.is_success() {
            return Err(CipherError::ModuleStatus {
                operation: operation.to_owned(),
                status: invocation.status,
            });
        }
        String::from_utf8(invocation.output).map_err(|_| CipherError::InvalidOutput {
            operation: operation.to_owned(),
        })
    }

    fn document(
        &mut self,
        operation: &str,
        resource: ResourceType,
        document: &[u8],
    ) -> Result<Transformed, CipherError> {
        let Self { runtime, registry } = self;
        transform(registry, resource, document, |value| Self::call(runtime, operation, value))
    }
}

impl<R: ModuleRuntime> CipherBackend for ModuleCipher<R> {
    fn name(&self) -> String {
        self.runtime.describe()
    }

    fn encode_value(&mut self, value: &str) -> Result<String, CipherError> {
        Self::call(&mut self.runtime, ENCODE_OPERATION, value)
    }

    fn decode_value(&mut self, value: &str) -> Result<String, CipherError> {
        Self::call(&mut self.runtime, DECODE_OPERATION, value)
    }

    fn encode_document(
        &mut self,
        resource: ResourceType,
        document: &[u8],
    ) -> Result<Transformed, CipherError> {
        self.document(ENCODE_OPERATION, resource, document)
    }

    fn decode_document(
        &mut self,
        resource: ResourceType,
        document: &[u8],
    ) -> Result<Transformed, CipherError> {
        self.document(DECODE_OPERATION, resource, document)
    }
}

// ── Construction ─────────────────────────────────────────────────────

/// Build the cipher backend described by `plugins`.
///
/// Plugins disabled, or no cipher configured, selects [`PassThroughCipher`].
/// Otherwise the module is loaded once, from its file if one is set and from
/// its URL if not, with its configuration resolved.
///
/// # Errors
///
/// Returns [`CipherError::ModuleLoad`] if a cipher is configured but has no
/// source, or its module cannot be loaded. The caller decides whether that
/// is fatal.
pub fn cipher_from_settings(
    plugins: &PluginSettings,
    registry: FieldRegistry,
) -> Result<Box<dyn CipherBackend>, CipherError> {
    if plugins.disabled {
        info!("plugins disabled, using pass-through cipher");
        return Ok(Box::new(PassThroughCipher));
    }
    let Some(module) = &plugins.cipher else {
        debug!("no cipher module configured, using pass-through cipher");
        return Ok(Box::new(PassThroughCipher));
    };

    let source = module.module_source().ok_or_else(|| CipherError::ModuleLoad {
        reason: "cipher module has neither file_path nor url".to_owned(),
    })?;
    let config = module.resolved_config();

    load_module(&source, &config, registry)
}

#[cfg(feature = "wasm-runtime")]
fn load_module(
    source: &fieldseal_module::ModuleSource,
    config: &crate::indirection::ResolvedConfig,
    registry: FieldRegistry,
) -> Result<Box<dyn CipherBackend>, CipherError> {
    let runtime = fieldseal_module::WasmRuntime::load(source, config.as_map())?;
    Ok(Box::new(ModuleCipher::new(runtime, registry)))
}

#[cfg(not(feature = "wasm-runtime"))]
fn load_module(
    source: &fieldseal_module::ModuleSource,
    _config: &crate::indirection::ResolvedConfig,
    _registry: FieldRegistry,
) -> Result<Box<dyn CipherBackend>, CipherError> {
    Err(fieldseal_module::ModuleError::Unsupported {
        name: format!("wasm ({source})"),
    }
    .into())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use fieldseal_module::{InProcessRuntime, Invocation, ModuleError};

    fn reversing() -> InProcessRuntime {
        InProcessRuntime::new("reverse", |_, payload| {
            let text = String::from_utf8_lossy(payload);
            Ok(Invocation::ok(text.chars().rev().collect::<String>()))
        })
    }

    #[test]
    fn pass_through_is_identity() {
        let mut cipher = PassThroughCipher;
        assert_eq!(cipher.encode_value("abc").unwrap(), "abc");
        assert_eq!(cipher.decode_value("abc").unwrap(), "abc");
        let doc = b"{\"token\": \"t\"}";
        assert_eq!(cipher.encode(ResourceType::Alerting, doc).unwrap(), doc);
        assert_eq!(cipher.decode(ResourceType::Alerting, b"not json").unwrap(), b"not json");
    }

    #[test]
    fn module_cipher_routes_operations() {
        let runtime = InProcessRuntime::new("tagger", |op, payload| {
            let mut out = op.as_bytes().to_vec();
            out.push(b':');
            out.extend_from_slice(payload);
            Ok(Invocation::ok(out))
        });
        let mut cipher = ModuleCipher::new(runtime, FieldRegistry::empty());
        assert_eq!(cipher.encode_value("v").unwrap(), "Encode:v");
        assert_eq!(cipher.decode_value("v").unwrap(), "Decode:v");
        assert_eq!(cipher.runtime().calls(), 2);
        assert_eq!(cipher.name(), "in-process 'tagger'");
    }

    #[test]
    fn non_zero_status_is_module_status_error() {
        let runtime = InProcessRuntime::new("failing", |_, _| Ok(Invocation::failed(2)));
        let mut cipher = ModuleCipher::new(runtime, FieldRegistry::empty());
        let err = cipher.encode_value("v").unwrap_err();
        assert!(matches!(
            err,
            CipherError::ModuleStatus { ref operation, status: 2 } if operation == "Encode"
        ));
    }

    #[test]
    fn runtime_failure_is_invocation_error() {
        let runtime = InProcessRuntime::new("trap", |op, _| {
            Err(ModuleError::Invoke {
                operation: op.to_owned(),
                reason: "unreachable executed".to_owned(),
            })
        });
        let mut cipher = ModuleCipher::new(runtime, FieldRegistry::empty());
        let err = cipher.decode_value("v").unwrap_err();
        assert!(matches!(err, CipherError::Invocation { ref operation, .. } if operation == "Decode"));
    }

    #[test]
    fn non_utf8_output_is_invalid_output() {
        let runtime = InProcessRuntime::new("binary", |_, _| Ok(Invocation::ok(vec![0xff, 0x00])));
        let mut cipher = ModuleCipher::new(runtime, FieldRegistry::empty());
        assert!(matches!(
            cipher.encode_value("v").unwrap_err(),
            CipherError::InvalidOutput { .. }
        ));
    }

    #[test]
    fn document_ops_use_the_registry() {
        let mut cipher = ModuleCipher::new(reversing(), FieldRegistry::builtin());
        let doc = br#"[{"receivers":[{"settings":{"url":"abc","other":"xyz"}}]}]"#;

        let encoded = cipher.encode(ResourceType::Alerting, doc).unwrap();
        assert_eq!(encoded, br#"[{"receivers":[{"settings":{"url":"cba","other":"xyz"}}]}]"#);
        assert_eq!(cipher.decode(ResourceType::Alerting, &encoded).unwrap(), doc);

        let untouched = cipher.encode(ResourceType::Dashboard, doc).unwrap();
        assert_eq!(untouched, doc);
    }

    #[test]
    fn failing_fields_are_reported_not_fatal() {
        let runtime = InProcessRuntime::new("picky", |_, payload| {
            if payload == b"bad" {
                Ok(Invocation::failed(1))
            } else {
                Ok(Invocation::ok(payload.to_ascii_uppercase()))
            }
        });
        let registry = FieldRegistry::empty()
            .with_patterns(ResourceType::Connection, ["#.password"])
            .unwrap();
        let mut cipher = ModuleCipher::new(runtime, registry);
        let report = cipher
            .encode_document(
                ResourceType::Connection,
                br#"[{"password":"ok"},{"password":"bad"}]"#,
            )
            .unwrap();
        assert_eq!(report.document, br#"[{"password":"OK"},{"password":"bad"}]"#);
        assert_eq!(report.transformed, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, "1.password");
    }

    #[test]
    fn disabled_plugins_select_pass_through() {
        let plugins = PluginSettings {
            disabled: true,
            cipher: Some(crate::settings::CipherModuleSettings {
                file_path: Some("/nonexistent.wasm".into()),
                ..Default::default()
            }),
        };
        let cipher = cipher_from_settings(&plugins, FieldRegistry::builtin()).unwrap();
        assert_eq!(cipher.name(), "pass-through");

        let cipher = cipher_from_settings(&PluginSettings::default(), FieldRegistry::builtin()).unwrap();
        assert_eq!(cipher.name(), "pass-through");
    }

    #[test]
    fn cipher_without_source_fails_to_load() {
        let plugins = PluginSettings {
            disabled: false,
            cipher: Some(crate::settings::CipherModuleSettings::default()),
        };
        let err = cipher_from_settings(&plugins, FieldRegistry::builtin()).err().unwrap();
        assert!(matches!(err, CipherError::ModuleLoad { .. }));
    }

    #[test]
    fn unloadable_module_is_module_load_error() {
        let plugins = PluginSettings {
            disabled: false,
            cipher: Some(crate::settings::CipherModuleSettings {
                file_path: Some("/definitely/not/here.wasm".into()),
                ..Default::default()
            }),
        };
        let err = cipher_from_settings(&plugins, FieldRegistry::builtin()).err().unwrap();
        assert!(matches!(err, CipherError::ModuleLoad { .. }));
    }
}
