//! Wildcard path patterns and the concrete paths they resolve to.
//!
//! A pattern is a dot-separated list of segments. Each segment is either an
//! exact object key or the wildcard token `#`, meaning "every element of the
//! array at this position". A literal dot inside a key is written `\.`, and
//! a literal `#` key is written `\#`.
//!
//! ```text
//! #.receivers.#.settings.url
//! │  │        │  │        └─ key
//! │  │        │  └─ key
//! │  │        └─ every element of `receivers`
//! │  └─ key
//! └─ every element of the root array
//! ```

use serde::{Deserialize, Serialize};

use crate::error::PatternError;

/// The wildcard token.
pub const WILDCARD: char = '#';

/// One segment of a [`WildcardPattern`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// An exact object key.
    Key(String),
    /// `#`: every element of the array at this position.
    Wildcard,
}

/// A parsed, immutable wildcard pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WildcardPattern {
    raw: String,
    segments: Vec<Segment>,
    wildcards: usize,
}

impl WildcardPattern {
    /// Parse a pattern such as `#.receivers.#.settings.url`.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::Empty`] for an empty string and
    /// [`PatternError::EmptySegment`] when two dots are adjacent or the
    /// pattern starts or ends with a dot.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        if raw.is_empty() {
            return Err(PatternError::Empty);
        }

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut escaped_current = false;
        let mut chars = raw.chars();

        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                        escaped_current = true;
                    } else {
                        current.push('\\');
                    }
                }
                '.' => {
                    segments.push(finish_segment(raw, &mut current, escaped_current, segments.len())?);
                    escaped_current = false;
                }
                other => current.push(other),
            }
        }
        segments.push(finish_segment(raw, &mut current, escaped_current, segments.len())?);

        let wildcards = segments
            .iter()
            .filter(|s| matches!(s, Segment::Wildcard))
            .count();

        Ok(Self {
            raw: raw.to_owned(),
            segments,
            wildcards,
        })
    }

    /// The pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The parsed segments, in order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Total number of `#` segments.
    #[must_use]
    pub fn wildcard_count(&self) -> usize {
        self.wildcards
    }
}

fn finish_segment(
    raw: &str,
    current: &mut String,
    escaped: bool,
    position: usize,
) -> Result<Segment, PatternError> {
    if current.is_empty() {
        return Err(PatternError::EmptySegment {
            pattern: raw.to_owned(),
            position,
        });
    }
    let text = std::mem::take(current);
    if !escaped && text.len() == 1 && text.starts_with(WILDCARD) {
        Ok(Segment::Wildcard)
    } else {
        Ok(Segment::Key(text))
    }
}

impl std::fmt::Display for WildcardPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for WildcardPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WildcardPattern {
    type Error = PatternError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WildcardPattern> for String {
    fn from(pattern: WildcardPattern) -> Self {
        pattern.raw
    }
}

/// One step of a [`ConcretePath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Step {
    /// Descend into an object member.
    Key(String),
    /// Descend into an array element.
    Index(usize),
}

/// A fully resolved location inside a document: a pattern with every `#`
/// replaced by the array index encountered during traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ConcretePath(Vec<Step>);

impl ConcretePath {
    /// The path's steps, root first.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.0
    }

    /// A new path with `step` appended. `self` is left untouched.
    #[must_use]
    pub fn child(&self, step: Step) -> Self {
        let mut steps = Vec::with_capacity(self.0.len() + 1);
        steps.extend_from_slice(&self.0);
        steps.push(step);
        Self(steps)
    }
}

impl From<Vec<Step>> for ConcretePath {
    fn from(steps: Vec<Step>) -> Self {
        Self(steps)
    }
}

impl std::fmt::Display for ConcretePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match step {
                Step::Index(idx) => write!(f, "{idx}")?,
                Step::Key(key) => {
                    for c in key.chars() {
                        if matches!(c, '.' | '\\') || (c == WILDCARD && key.len() == 1) {
                            f.write_str("\\")?;
                        }
                        write!(f, "{c}")?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn key(k: &str) -> Segment {
        Segment::Key(k.to_owned())
    }

    #[test]
    fn parses_keys_and_wildcards() {
        let p = WildcardPattern::parse("#.receivers.#.settings.url").unwrap();
        assert_eq!(
            p.segments(),
            &[
                Segment::Wildcard,
                key("receivers"),
                Segment::Wildcard,
                key("settings"),
                key("url"),
            ]
        );
        assert_eq!(p.wildcard_count(), 2);
        assert_eq!(p.as_str(), "#.receivers.#.settings.url");
    }

    #[test]
    fn single_key_has_no_wildcards() {
        let p = WildcardPattern::parse("token").unwrap();
        assert_eq!(p.segments(), &[key("token")]);
        assert_eq!(p.wildcard_count(), 0);
    }

    #[test]
    fn hash_inside_a_key_is_not_a_wildcard() {
        let p = WildcardPattern::parse("a#b.#x").unwrap();
        assert_eq!(p.segments(), &[key("a#b"), key("#x")]);
        assert_eq!(p.wildcard_count(), 0);
    }

    #[test]
    fn escapes_dot_and_hash() {
        let p = WildcardPattern::parse(r"settings.smtp\.password.\#").unwrap();
        assert_eq!(
            p.segments(),
            &[key("settings"), key("smtp.password"), key("#")]
        );
        assert_eq!(p.wildcard_count(), 0);
    }

    #[test]
    fn rejects_empty_pattern() {
        assert_eq!(WildcardPattern::parse(""), Err(PatternError::Empty));
    }

    #[test]
    fn rejects_empty_segments() {
        for bad in ["a..b", ".a", "a.", "."] {
            let err = WildcardPattern::parse(bad).unwrap_err();
            assert!(
                matches!(err, PatternError::EmptySegment { .. }),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn deserializes_from_string() {
        let p: WildcardPattern = serde_json::from_str("\"#.token\"").unwrap();
        assert_eq!(p.wildcard_count(), 1);
        assert!(serde_json::from_str::<WildcardPattern>("\"a..b\"").is_err());
        assert_eq!(serde_json::to_string(&p).unwrap(), "\"#.token\"");
    }

    #[test]
    fn child_does_not_touch_parent() {
        let parent = ConcretePath::from(vec![Step::Index(0)]);
        let left = parent.child(Step::Key("a".into()));
        let right = parent.child(Step::Index(7));
        assert_eq!(parent.steps().len(), 1);
        assert_eq!(left.to_string(), "0.a");
        assert_eq!(right.to_string(), "0.7");
    }

    #[test]
    fn concrete_path_display_escapes_keys() {
        let path = ConcretePath::from(vec![
            Step::Index(2),
            Step::Key("smtp.password".into()),
            Step::Key("#".into()),
        ]);
        assert_eq!(path.to_string(), r"2.smtp\.password.\#");
    }
}
