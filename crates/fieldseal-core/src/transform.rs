//! Value transformer: applies a string transform to every secure field of a
//! document.
//!
//! For a given resource type the transformer looks up the registered
//! patterns, resolves each one against the *current* document, runs the
//! transform on every matched leaf, and writes each result back before the
//! next pattern is resolved. Paths are purely structural (keys and indices),
//! so earlier writes never move later matches.
//!
//! A failing field is logged, reported, and left as it was. It never aborts
//! the document or affects any other field.

use serde_json::Value;
use tracing::{debug, error, trace, warn};

use crate::error::CipherError;
use crate::pattern::{ConcretePath, Step};
use crate::registry::FieldRegistry;
use crate::resolver::{LeafKind, resolve};
use crate::resource::ResourceType;
use crate::splice;

/// A field that could not be transformed and was left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFailure {
    /// The pattern that matched the field.
    pub pattern: String,
    /// Concrete path of the field.
    pub path: String,
    /// Why the transform failed. Never contains the field's value.
    pub reason: String,
}

/// Outcome of [`transform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed {
    /// The resulting document bytes.
    pub document: Vec<u8>,
    /// Number of fields rewritten.
    pub transformed: usize,
    /// Fields left untouched because their transform failed.
    pub failures: Vec<FieldFailure>,
}

impl Transformed {
    pub(crate) fn unchanged(raw: &[u8]) -> Self {
        Self {
            document: raw.to_vec(),
            transformed: 0,
            failures: Vec::new(),
        }
    }

    /// Whether every matched field was transformed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Apply `apply` to every secure field registered for `resource` in `raw`.
///
/// An unregistered resource type returns `raw` unchanged, byte for byte,
/// without parsing it. Otherwise only the bytes of successfully transformed
/// leaves change; everything else is preserved exactly. Each new value is
/// written as a JSON string. `null` leaves are skipped.
///
/// # Errors
///
/// Returns [`CipherError::InvalidDocument`] if `raw` is not UTF-8 JSON and
/// `resource` has registered patterns. Per-field failures are not errors;
/// they are reported in [`Transformed::failures`].
pub fn transform<F, E>(
    registry: &FieldRegistry,
    resource: ResourceType,
    raw: &[u8],
    mut apply: F,
) -> Result<Transformed, CipherError>
where
    F: FnMut(&str) -> Result<String, E>,
    E: std::fmt::Display,
{
    let patterns = registry.patterns_for(resource);
    if patterns.is_empty() {
        trace!(resource = %resource, "no secure fields registered, passing through");
        return Ok(Transformed::unchanged(raw));
    }

    let invalid = |reason: String| CipherError::InvalidDocument {
        resource: resource.to_string(),
        reason,
    };
    let text = std::str::from_utf8(raw).map_err(|e| invalid(e.to_string()))?;
    let mut tree: Value = serde_json::from_str(text).map_err(|e| invalid(e.to_string()))?;
    let mut output = text.to_owned();

    let mut transformed = 0usize;
    let mut failures = Vec::new();

    for pattern in patterns {
        let matches = resolve(pattern, &tree);
        debug!(resource = %resource, pattern = %pattern, count = matches.len(), "resolved secure fields");

        let mut pending = Vec::with_capacity(matches.len());
        for field in matches {
            if field.kind == LeafKind::Null {
                trace!(path = %field.path, "null field, nothing to transform");
                continue;
            }

            match apply(&field.value) {
                Ok(new_value) => pending.push((field.path, new_value)),
                Err(e) => {
                    warn!(
                        resource = %resource,
                        path = %field.path,
                        error = %e,
                        "failed to transform secure field, keeping original value"
                    );
                    failures.push(FieldFailure {
                        pattern: pattern.to_string(),
                        path: field.path.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        if pending.is_empty() {
            continue;
        }

        // One pass over the text for the whole pattern.
        let (next, written) = splice::set_strings(&output, &pending);
        output = next;

        for ((path, new_value), ok) in pending.into_iter().zip(written) {
            if !ok {
                error!(resource = %resource, path = %path, "failed to write secure field back");
                failures.push(FieldFailure {
                    pattern: pattern.to_string(),
                    path: path.to_string(),
                    reason: "path not found during write-back".to_owned(),
                });
                continue;
            }
            if let Some(node) = node_mut(&mut tree, &path) {
                *node = Value::String(new_value);
            }
            transformed += 1;
        }
    }

    debug!(resource = %resource, transformed, failed = failures.len(), "document transformed");

    Ok(Transformed {
        document: output.into_bytes(),
        transformed,
        failures,
    })
}

fn node_mut<'a>(root: &'a mut Value, path: &ConcretePath) -> Option<&'a mut Value> {
    let mut current = root;
    for step in path.steps() {
        current = match step {
            Step::Key(key) => current.get_mut(key.as_str())?,
            Step::Index(idx) => current.get_mut(*idx)?,
        };
    }
    Some(current)
}
