//! Secure-field registry.
//!
//! Maps each [`ResourceType`] to the ordered list of wildcard patterns that
//! locate its sensitive values. Pattern order is registration order and is
//! the order the transformer applies them in.

use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use crate::error::{ConfigError, PatternError};
use crate::pattern::WildcardPattern;
use crate::resource::ResourceType;

/// Patterns registered for alerting resources by default: contact-point
/// receiver settings that carry webhook URLs and credentials.
pub const DEFAULT_ALERTING_PATTERNS: [&str; 3] = [
    "#.receivers.#.settings.url",
    "#.receivers.#.settings.password",
    "#.receivers.#.settings.token",
];

/// Resource type → ordered secure-field patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRegistry {
    entries: BTreeMap<ResourceType, Vec<WildcardPattern>>,
}

impl FieldRegistry {
    /// An empty registry: every resource type passes through untouched.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in registry (alerting contact-point secrets).
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for raw in DEFAULT_ALERTING_PATTERNS {
            if let Ok(pattern) = WildcardPattern::parse(raw) {
                registry.register(ResourceType::Alerting, pattern);
            }
        }
        registry
    }

    /// Append `pattern` to the list for `resource`.
    pub fn register(&mut self, resource: ResourceType, pattern: WildcardPattern) {
        self.entries.entry(resource).or_default().push(pattern);
    }

    /// Builder form of [`register`](Self::register) that parses each pattern.
    ///
    /// # Errors
    ///
    /// Returns the first [`PatternError`] encountered; nothing is registered
    /// in that case.
    pub fn with_patterns<I, S>(mut self, resource: ResourceType, patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed = patterns
            .into_iter()
            .map(|p| WildcardPattern::parse(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        for pattern in parsed {
            self.register(resource, pattern);
        }
        Ok(self)
    }

    /// Build a registry from a settings map (`resource name → patterns`).
    ///
    /// Unknown resource names are logged and skipped so that settings written
    /// for a newer release still load.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Pattern`] if any pattern of a known resource is
    /// malformed.
    pub fn from_settings(map: &HashMap<String, Vec<String>>) -> Result<Self, ConfigError> {
        let mut registry = Self::empty();
        let mut names: Vec<_> = map.keys().collect();
        names.sort();

        for name in names {
            let Ok(resource) = name.parse::<ResourceType>() else {
                warn!(resource = %name, "ignoring secure fields for unknown resource type");
                continue;
            };
            for raw in &map[name] {
                let pattern = WildcardPattern::parse(raw).map_err(|source| ConfigError::Pattern {
                    resource: name.clone(),
                    source,
                })?;
                registry.register(resource, pattern);
            }
        }
        Ok(registry)
    }

    /// Patterns for `resource`, in registration order. Empty when the
    /// resource has none, which the transformer treats as pass-through.
    #[must_use]
    pub fn patterns_for(&self, resource: ResourceType) -> &[WildcardPattern] {
        self.entries.get(&resource).map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether any pattern is registered for `resource`.
    #[must_use]
    pub fn is_registered(&self, resource: ResourceType) -> bool {
        !self.patterns_for(resource).is_empty()
    }

    /// Registered resource types with their patterns, in resource order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceType, &[WildcardPattern])> {
        self.entries.iter().map(|(r, p)| (*r, p.as_slice()))
    }
}
