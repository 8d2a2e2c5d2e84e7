//! In-place write-back into raw JSON text.
//!
//! The transformer never re-serializes a document. Instead it locates the
//! exact byte span of a leaf inside the original text and replaces only
//! that span, so whitespace, key order, number formatting, and every other
//! unmatched byte survive untouched.
//!
//! Spans are found with [`RawValue`]: each nested value borrows its text
//! from the enclosing one, so its offset is the distance between the two
//! slices' start pointers.

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

use serde_json::value::RawValue;

use crate::pattern::{ConcretePath, Step};

/// A path still being looked up: its slot in the caller's list and the
/// steps left below the current node.
type Target<'p> = (usize, &'p [Step]);

/// Byte spans of the values at `paths` inside `raw`, in the same order.
///
/// All paths are found in one descent: each container on the way is parsed
/// once no matter how many paths pass through it. A path that does not
/// exist, or any path when `raw` is not valid JSON, gets `None`.
pub(crate) fn locate_all(raw: &str, paths: &[&ConcretePath]) -> Vec<Option<Range<usize>>> {
    let mut spans = vec![None; paths.len()];
    let Ok(root) = serde_json::from_str::<&RawValue>(raw) else {
        return spans;
    };
    let targets: Vec<Target<'_>> = paths
        .iter()
        .enumerate()
        .map(|(slot, path)| (slot, path.steps()))
        .collect();
    descend(raw, root, &targets, &mut spans);
    spans
}

/// The direct children of a node, parsed once.
enum Children<'a> {
    Object(HashMap<String, &'a RawValue>),
    Array(Vec<&'a RawValue>),
    Scalar,
}

impl<'a> Children<'a> {
    fn of(node: &'a RawValue) -> Self {
        let text = node.get();
        if text.starts_with('{') {
            serde_json::from_str(text).map_or(Self::Scalar, Self::Object)
        } else if text.starts_with('[') {
            serde_json::from_str(text).map_or(Self::Scalar, Self::Array)
        } else {
            Self::Scalar
        }
    }

    fn get(&self, step: &Step) -> Option<&'a RawValue> {
        match (self, step) {
            (Self::Object(members), Step::Key(key)) => members.get(key).copied(),
            (Self::Array(items), Step::Index(idx)) => items.get(*idx).copied(),
            _ => None,
        }
    }
}

fn descend<'a>(
    raw: &str,
    node: &'a RawValue,
    targets: &[Target<'_>],
    spans: &mut [Option<Range<usize>>],
) {
    let mut parsed: Option<Children<'a>> = None;
    // Children keyed by their start address, so shared prefixes descend once.
    let mut next: BTreeMap<usize, (&'a RawValue, Vec<Target<'_>>)> = BTreeMap::new();

    for &(slot, steps) in targets {
        let Some((step, rest)) = steps.split_first() else {
            spans[slot] = span_of(raw, node);
            continue;
        };
        if let Some(child) = parsed.get_or_insert_with(|| Children::of(node)).get(step) {
            next.entry(child.get().as_ptr() as usize)
                .or_insert_with(|| (child, Vec::new()))
                .1
                .push((slot, rest));
        }
    }

    for (child, rest) in next.into_values() {
        descend(raw, child, &rest, spans);
    }
}

fn span_of(raw: &str, node: &RawValue) -> Option<Range<usize>> {
    let text = node.get();
    let start = (text.as_ptr() as usize).checked_sub(raw.as_ptr() as usize)?;
    let end = start.checked_add(text.len())?;
    (end <= raw.len()).then_some(start..end)
}

/// Byte span of the value at `path` inside `raw`.
#[cfg(test)]
pub(crate) fn locate(raw: &str, path: &ConcretePath) -> Option<Range<usize>> {
    locate_all(raw, &[path]).pop().flatten()
}

/// Replace the value at each path with its JSON-encoded string.
///
/// Returns the new text and, per edit, whether it was written. An edit whose
/// path cannot be found, or whose span overlaps an earlier one, is skipped.
/// The text is rebuilt in a single pass.
pub(crate) fn set_strings(raw: &str, edits: &[(ConcretePath, String)]) -> (String, Vec<bool>) {
    let paths: Vec<&ConcretePath> = edits.iter().map(|(path, _)| path).collect();
    let mut placed: Vec<(Range<usize>, usize)> = locate_all(raw, &paths)
        .into_iter()
        .enumerate()
        .filter_map(|(slot, span)| span.map(|span| (span, slot)))
        .collect();
    placed.sort_by_key(|(span, _)| span.start);

    let mut written = vec![false; edits.len()];
    let mut out = String::with_capacity(raw.len());
    let mut cursor = 0;
    for (span, slot) in placed {
        if span.start < cursor {
            continue;
        }
        let Ok(encoded) = serde_json::to_string(&edits[slot].1) else {
            continue;
        };
        out.push_str(&raw[cursor..span.start]);
        out.push_str(&encoded);
        cursor = span.end;
        written[slot] = true;
    }
    out.push_str(&raw[cursor..]);
    (out, written)
}
