//! Wildcard path resolver.
//!
//! Walks a document tree against a [`WildcardPattern`] and yields every
//! concrete location the pattern addresses, together with the string form of
//! the value found there.
//!
//! Resolution rules:
//!
//! - When the pattern is exhausted, the node reached is a **leaf**. Objects
//!   and scalars are emitted as-is; a non-empty array is emitted as one
//!   opaque leaf (all wildcards are consumed by then, so the pattern
//!   addresses "the whole remaining collection"). This holds at any depth.
//! - An empty array never yields a match, wherever it is met.
//! - A `#` segment over a non-empty array recurses into every element, each
//!   branch with its own copy of the path so far.
//! - A missing key, a `#` over a non-array, or a key over a scalar ends the
//!   branch silently. A purely numeric key over an array indexes it.
//!
//! Absence is never an error: the resolver has no failure mode.

use serde_json::Value;
use tracing::trace;

use crate::pattern::{ConcretePath, Segment, Step, WildcardPattern};

/// The JSON type of a matched leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    String,
    Number,
    Bool,
    Null,
    Object,
    /// A non-empty array reached with every wildcard already consumed.
    Array,
}

/// A concrete location matched by a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatch {
    /// Where the leaf lives, with every wildcard replaced by an index.
    pub path: ConcretePath,
    /// The leaf's string form: a string's content, or the compact JSON text
    /// of any other value.
    pub value: String,
    /// The leaf's JSON type.
    pub kind: LeafKind,
}

/// Resolve `pattern` against `root`, in document order.
#[must_use]
pub fn resolve(pattern: &WildcardPattern, root: &Value) -> Vec<FieldMatch> {
    let mut matches = Vec::new();
    walk(
        pattern,
        pattern.segments(),
        root,
        &ConcretePath::default(),
        0,
        &mut matches,
    );
    matches
}

fn walk(
    pattern: &WildcardPattern,
    remaining: &[Segment],
    node: &Value,
    path: &ConcretePath,
    consumed: usize,
    out: &mut Vec<FieldMatch>,
) {
    let Some((segment, rest)) = remaining.split_first() else {
        emit_leaf(pattern, node, path, consumed, out);
        return;
    };

    match (segment, node) {
        (_, Value::Array(items)) if items.is_empty() => {
            trace!(pattern = %pattern, path = %path, "empty array, nothing to resolve");
        }
        (Segment::Wildcard, Value::Array(items)) => {
            for (idx, item) in items.iter().enumerate() {
                walk(pattern, rest, item, &path.child(Step::Index(idx)), consumed + 1, out);
            }
        }
        (Segment::Key(key), Value::Object(map)) => {
            if let Some(child) = map.get(key) {
                walk(pattern, rest, child, &path.child(Step::Key(key.clone())), consumed, out);
            }
        }
        (Segment::Key(key), Value::Array(items)) => {
            // Digits only: `usize::from_str` would also take a leading `+`.
            if let Some((idx, child)) = key
                .bytes()
                .all(|b| b.is_ascii_digit())
                .then(|| key.parse::<usize>().ok())
                .flatten()
                .and_then(|idx| items.get(idx).map(|child| (idx, child)))
            {
                walk(pattern, rest, child, &path.child(Step::Index(idx)), consumed, out);
            }
        }
        _ => {
            trace!(pattern = %pattern, path = %path, "pattern deeper than document, branch ends");
        }
    }
}

fn emit_leaf(
    pattern: &WildcardPattern,
    node: &Value,
    path: &ConcretePath,
    consumed: usize,
    out: &mut Vec<FieldMatch>,
) {
    let (value, kind) = match node {
        Value::Array(items) if items.is_empty() => {
            trace!(pattern = %pattern, path = %path, "empty array leaf, skipping");
            return;
        }
        Value::Array(_) => (node.to_string(), LeafKind::Array),
        Value::String(s) => (s.clone(), LeafKind::String),
        Value::Number(_) => (node.to_string(), LeafKind::Number),
        Value::Bool(_) => (node.to_string(), LeafKind::Bool),
        Value::Null => (node.to_string(), LeafKind::Null),
        Value::Object(_) => (node.to_string(), LeafKind::Object),
    };

    trace!(
        pattern = %pattern,
        path = %path,
        wildcards = pattern.wildcard_count(),
        consumed,
        kind = ?kind,
        "leaf found"
    );

    out.push(FieldMatch {
        path: path.clone(),
        value,
        kind,
    });
}
