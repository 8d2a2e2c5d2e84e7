//! Settings for `fieldseal`.
//!
//! Loaded from a YAML file with sensible defaults. A few values can be
//! overridden via `FIELDSEAL_*` environment variables.
//!
//! ```yaml
//! plugins:
//!   disabled: false
//!   cipher:
//!     file_path: ./cipher.wasm
//!     config:
//!       passphrase: env:CIPHER_PASSPHRASE
//! secure_config:
//!   alerting:
//!     - "#.receivers.#.settings.url"
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use fieldseal_module::ModuleSource;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::indirection::ResolvedConfig;
use crate::registry::FieldRegistry;

/// Environment variable naming the settings file.
pub const CONFIG_ENV: &str = "FIELDSEAL_CONFIG";

/// Settings file used when none is named.
pub const DEFAULT_CONFIG_FILE: &str = "fieldseal.yml";

/// Environment variable overriding `plugins.disabled` (`true`/`1`).
pub const PLUGINS_DISABLED_ENV: &str = "FIELDSEAL_PLUGINS_DISABLED";

/// Top-level settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Cipher module settings.
    pub plugins: PluginSettings,
    /// Secure-field patterns per resource type. When absent, the built-in
    /// registry is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure_config: Option<HashMap<String, Vec<String>>>,
}

/// The `plugins` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSettings {
    /// Ignore any configured cipher and pass values through.
    pub disabled: bool,
    /// The cipher module, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cipher: Option<CipherModuleSettings>,
}

/// Where to load the cipher module from and what to hand it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CipherModuleSettings {
    /// Remote module location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Local module file. Takes precedence over `url`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    /// Module configuration. Values may use `env:` / `file:` indirection.
    pub config: BTreeMap<String, String>,
}

impl Settings {
    /// Parse settings from YAML text. `origin` names the source in errors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not valid settings YAML.
    pub fn from_yaml(text: &str, origin: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| ConfigError::Parse {
            path: origin.to_owned(),
            reason: e.to_string(),
        })
    }

    /// Load settings from the YAML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is malformed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let origin = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: origin.clone(),
            reason: e.to_string(),
        })?;
        let settings = Self::from_yaml(&text, &origin)?;
        info!(path = %origin, "settings loaded");
        Ok(settings)
    }

    /// Like [`load`](Self::load), but a missing file yields default settings.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load) for any failure other than "not found".
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!(path = %path.display(), "no settings file, using defaults");
            Ok(Self::default())
        }
    }

    /// Apply `FIELDSEAL_*` overrides from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply `FIELDSEAL_*` overrides, looking variables up through `lookup`.
    #[must_use]
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(PLUGINS_DISABLED_ENV) {
            self.plugins.disabled = value == "true" || value == "1";
        }
        self
    }

    /// Build the field registry these settings describe.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Pattern`] if a configured pattern is malformed.
    pub fn registry(&self) -> Result<FieldRegistry, ConfigError> {
        match &self.secure_config {
            Some(map) => FieldRegistry::from_settings(map),
            None => Ok(FieldRegistry::builtin()),
        }
    }
}

impl CipherModuleSettings {
    /// The module location, preferring a local file over a URL. `None` when
    /// neither is set.
    #[must_use]
    pub fn module_source(&self) -> Option<ModuleSource> {
        if let Some(path) = self.file_path.as_ref().filter(|p| !p.as_os_str().is_empty()) {
            return Some(ModuleSource::File(path.clone()));
        }
        self.url
            .as_ref()
            .filter(|u| !u.trim().is_empty())
            .map(|u| ModuleSource::Url(u.clone()))
    }

    /// The module configuration with every `env:` / `file:` reference
    /// resolved.
    #[must_use]
    pub fn resolved_config(&self) -> ResolvedConfig {
        ResolvedConfig::resolve(&self.config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::resource::ResourceType;

    const FULL: &str = r##"
plugins:
  disabled: false
  cipher:
    url: https://example.com/cipher.wasm
    file_path: ./cipher.wasm
    config:
      passphrase: env:CIPHER_PASSPHRASE
      mode: aes
secure_config:
  alerting:
    - "#.receivers.#.settings.url"
  connection:
    - "secureJsonData.password"
"##;

    #[test]
    fn parses_full_settings() {
        let settings = Settings::from_yaml(FULL, "inline").unwrap();
        let cipher = settings.plugins.cipher.as_ref().unwrap();
        assert_eq!(cipher.url.as_deref(), Some("https://example.com/cipher.wasm"));
        assert_eq!(cipher.config.get("mode").map(String::as_str), Some("aes"));

        let registry = settings.registry().unwrap();
        assert_eq!(registry.patterns_for(ResourceType::Alerting).len(), 1);
        assert_eq!(
            registry.patterns_for(ResourceType::Connection)[0].as_str(),
            "secureJsonData.password"
        );
    }

    #[test]
    fn empty_text_is_default() {
        assert_eq!(Settings::from_yaml("  \n", "inline").unwrap(), Settings::default());
        let settings = Settings::from_yaml("plugins: {}\n", "inline").unwrap();
        assert!(!settings.plugins.disabled);
        assert!(settings.plugins.cipher.is_none());
    }

    #[test]
    fn missing_secure_config_uses_builtin_registry() {
        let registry = Settings::default().registry().unwrap();
        assert_eq!(registry, FieldRegistry::builtin());
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = Settings::from_yaml("plugins: [unclosed", "bad.yml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref path, .. } if path == "bad.yml"));
    }

    #[test]
    fn bad_pattern_is_a_registry_error() {
        let settings = Settings::from_yaml("secure_config:\n  team:\n    - \"a..b\"\n", "inline").unwrap();
        assert!(matches!(settings.registry(), Err(ConfigError::Pattern { .. })));
    }

    #[test]
    fn file_path_is_preferred_over_url() {
        let settings = Settings::from_yaml(FULL, "inline").unwrap();
        let source = settings.plugins.cipher.unwrap().module_source().unwrap();
        assert_eq!(source, ModuleSource::File(PathBuf::from("./cipher.wasm")));
    }

    #[test]
    fn url_is_used_without_file_path() {
        let module = CipherModuleSettings {
            url: Some("https://example.com/c.wasm".into()),
            file_path: Some(PathBuf::new()),
            ..CipherModuleSettings::default()
        };
        assert_eq!(
            module.module_source(),
            Some(ModuleSource::Url("https://example.com/c.wasm".into()))
        );
        assert_eq!(CipherModuleSettings::default().module_source(), None);
    }

    #[test]
    fn env_override_disables_plugins() {
        let settings = Settings::from_yaml(FULL, "inline")
            .unwrap()
            .with_overrides_from(|name| (name == PLUGINS_DISABLED_ENV).then(|| "1".to_owned()));
        assert!(settings.plugins.disabled);

        let settings = settings.with_overrides_from(|_| Some("false".to_owned()));
        assert!(!settings.plugins.disabled);
    }

    #[test]
    fn load_reads_file_and_load_or_default_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fieldseal.yml");
        std::fs::write(&path, "plugins:\n  disabled: true\n").unwrap();
        assert!(Settings::load(&path).unwrap().plugins.disabled);

        let missing = dir.path().join("absent.yml");
        assert!(matches!(Settings::load(&missing), Err(ConfigError::Read { .. })));
        assert_eq!(Settings::load_or_default(&missing).unwrap(), Settings::default());
    }
}
