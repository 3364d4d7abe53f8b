//! Dotted field paths into the nested structure of an observed object.
//!
//! Paths are compared segment-wise, never character-wise: `spec.items`
//! is a prefix of `spec.items.count` but not of `spec.itemsizes`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered sequence of object keys addressing one field.
///
/// The empty path addresses the whole object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// The empty path, addressing the whole object.
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse a dotted string such as `spec.replicas`.
    ///
    /// Blank input yields the root path; empty segments are dropped.
    #[must_use]
    pub fn parse(dotted: &str) -> Self {
        Self(
            dotted.split('.')
                .filter(|segment| !segment.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Segment-wise prefix test; every path starts with the root path.
    #[must_use]
    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// The remainder after `prefix`, or `None` when `prefix` does not apply.
    #[must_use]
    pub fn strip_prefix(&self, prefix: &FieldPath) -> Option<FieldPath> {
        self.0
            .strip_prefix(prefix.0.as_slice())
            .map(|rest| Self(rest.to_vec()))
    }

    /// This path extended by one more key.
    #[must_use]
    pub fn child(&self, segment: &str) -> FieldPath {
        let mut segments = self.0.clone();
        segments.push(segment.to_owned());
        Self(segments)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl From<&str> for FieldPath {
    fn from(dotted: &str) -> Self {
        Self::parse(dotted)
    }
}

impl<S: Into<String>> FromIterator<S> for FieldPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Resolve a path through nested objects.
///
/// Absent keys, non-object intermediaries, and explicit `null` values all
/// resolve to `None`: a field holding `null` is treated as not existing.
#[must_use]
pub fn resolve<'a>(value: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.segments() {
        current = current.as_object()?.get(segment)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}
