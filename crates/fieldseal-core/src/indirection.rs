//! Cipher module configuration with `env:` / `file:` indirection.
//!
//! Values in the module's configuration map may point elsewhere instead of
//! holding a secret inline:
//!
//! - `env:NAME` resolves to the value of environment variable `NAME`.
//! - `file:PATH` resolves to the contents of `PATH`, after `$VAR` and
//!   `${VAR}` references in the path are expanded.
//!
//! A reference that cannot be resolved (unset or empty variable, unreadable
//! file) keeps its literal text. Resolution happens once; the result is an
//! immutable [`ResolvedConfig`].

use std::collections::BTreeMap;

use tracing::{debug, warn};

/// Prefix marking an environment-variable reference.
pub const ENV_PREFIX: &str = "env:";

/// Prefix marking a file reference.
pub const FILE_PREFIX: &str = "file:";

/// Module configuration with every indirection resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedConfig {
    values: BTreeMap<String, String>,
}

impl ResolvedConfig {
    /// Resolve `raw` against the process environment and filesystem.
    #[must_use]
    pub fn resolve(raw: &BTreeMap<String, String>) -> Self {
        Self::resolve_with(raw, |name| std::env::var(name).ok())
    }

    /// Resolve `raw`, looking environment variables up through `lookup`.
    #[must_use]
    pub fn resolve_with<F>(raw: &BTreeMap<String, String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let values = raw
            .iter()
            .map(|(key, value)| (key.clone(), resolve_value(key, value, &lookup)))
            .collect();
        Self { values }
    }

    /// The resolved value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// The resolved map, as handed to the cipher module.
    #[must_use]
    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    /// Number of configuration entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the configuration has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn resolve_value<F>(key: &str, value: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(name) = value.strip_prefix(ENV_PREFIX) {
        match lookup(name).filter(|v| !v.is_empty()) {
            Some(resolved) => {
                debug!(key, variable = name, "resolved module config from environment");
                return resolved;
            }
            None => debug!(key, variable = name, "environment variable unset, keeping literal"),
        }
    } else if let Some(location) = value.strip_prefix(FILE_PREFIX) {
        let path = expand_env(location, lookup);
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                debug!(key, path = %path, "resolved module config from file");
                return contents;
            }
            Err(e) => {
                warn!(key, path = %path, error = %e, "unable to read module config file, using value as string");
            }
        }
    }
    value.to_owned()
}

/// Expand `$VAR` and `${VAR}` references in `input`.
///
/// Unset variables expand to the empty string. A `$` not followed by a
/// variable name is kept as-is.
#[must_use]
pub fn expand_env<F>(input: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(braced) = after.strip_prefix('{') {
            if let Some(end) = braced.find('}') {
                out.push_str(&lookup(&braced[..end]).unwrap_or_default());
                rest = &braced[end + 1..];
                continue;
            }
            out.push('$');
            rest = after;
            continue;
        }

        let name_len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        if name_len == 0 {
            out.push('$');
        } else {
            out.push_str(&lookup(&after[..name_len]).unwrap_or_default());
        }
        rest = &after[name_len..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    fn raw(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn env_reference_resolves() {
        let config = ResolvedConfig::resolve_with(
            &raw(&[("passphrase", "env:CIPHER_KEY")]),
            env(&[("CIPHER_KEY", "s3cr3t")]),
        );
        assert_eq!(config.get("passphrase"), Some("s3cr3t"));
    }

    #[test]
    fn unset_or_empty_env_keeps_literal() {
        let config = ResolvedConfig::resolve_with(
            &raw(&[("a", "env:MISSING"), ("b", "env:EMPTY")]),
            env(&[("EMPTY", "")]),
        );
        assert_eq!(config.get("a"), Some("env:MISSING"));
        assert_eq!(config.get("b"), Some("env:EMPTY"));
    }

    #[test]
    fn file_reference_reads_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.txt");
        std::fs::write(&path, "from-file\n").unwrap();

        let reference = format!("file:{}", path.display());
        let config = ResolvedConfig::resolve_with(&raw(&[("key", reference.as_str())]), env(&[]));
        assert_eq!(config.get("key"), Some("from-file\n"));
    }

    #[test]
    fn file_path_expands_environment() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("key.txt"), "expanded").unwrap();
        let dir_str = dir.path().display().to_string();

        let config = ResolvedConfig::resolve_with(
            &raw(&[("a", "file:${KEYS}/key.txt"), ("b", "file:$KEYS/key.txt")]),
            env(&[("KEYS", dir_str.as_str())]),
        );
        assert_eq!(config.get("a"), Some("expanded"));
        assert_eq!(config.get("b"), Some("expanded"));
    }

    #[test]
    fn unreadable_file_keeps_literal() {
        let config = ResolvedConfig::resolve_with(
            &raw(&[("key", "file:/no/such/dir/key.txt")]),
            env(&[]),
        );
        assert_eq!(config.get("key"), Some("file:/no/such/dir/key.txt"));
    }

    #[test]
    fn plain_values_pass_through() {
        let config = ResolvedConfig::resolve_with(
            &raw(&[("mode", "aes"), ("note", "uses env: later")]),
            env(&[("x", "y")]),
        );
        assert_eq!(config.get("mode"), Some("aes"));
        assert_eq!(config.get("note"), Some("uses env: later"));
        assert_eq!(config.len(), 2);
        assert!(!config.is_empty());
        assert!(ResolvedConfig::resolve_with(&raw(&[]), env(&[])).is_empty());
    }

    #[test]
    fn expand_env_handles_edge_cases() {
        let lookup = env(&[("HOME", "/home/ops"), ("A_1", "x")]);
        assert_eq!(expand_env("$HOME/keys", &lookup), "/home/ops/keys");
        assert_eq!(expand_env("${HOME}keys", &lookup), "/home/opskeys");
        assert_eq!(expand_env("$A_1-$UNSET-", &lookup), "x--");
        assert_eq!(expand_env("cost $ 5", &lookup), "cost $ 5");
        assert_eq!(expand_env("${open", &lookup), "${open");
        assert_eq!(expand_env("trailing$", &lookup), "trailing$");
    }
}
