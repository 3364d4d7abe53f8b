//! Match conditions deciding whether a handler applies to a cause.
//!
//! Checks run cheapest first and short-circuit on the first mismatch:
//! field scope, then labels, then annotations, then the `when` predicate.

use std::fmt;
use std::sync::Arc;

use reeve_core::FieldPath;

use crate::cause::FilterCtx;
use crate::handler::ResourceHandler;

/// Arbitrary predicate over the shared cause context.
pub type WhenFn = Arc<dyn Fn(&FilterCtx<'_>) -> bool + Send + Sync>;

/// Predicate over one metadata value plus the shared cause context.
/// The value is `None` when the key is present but holds a non-string.
pub type MetaPredicateFn = Arc<dyn Fn(Option<&str>, &FilterCtx<'_>) -> bool + Send + Sync>;

/// Constraint on one label or annotation key.
#[derive(Clone)]
pub enum MetaFilter {
    /// The key must hold exactly this value.
    Literal(String),
    /// The key must exist, with any value.
    Present,
    /// The key must not exist.
    Absent,
    /// The key must exist and the predicate must accept its value.
    Predicate(MetaPredicateFn),
}

impl MetaFilter {
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    #[must_use]
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(Option<&str>, &FilterCtx<'_>) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(predicate))
    }

    pub(crate) fn accepts(&self, present: bool, value: Option<&str>, ctx: &FilterCtx<'_>) -> bool {
        match self {
            Self::Literal(want) => value == Some(want.as_str()),
            Self::Present => present,
            Self::Absent => !present,
            Self::Predicate(predicate) => present && predicate(value, ctx),
        }
    }
}

impl fmt::Debug for MetaFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Present => write!(f, "Present"),
            Self::Absent => write!(f, "Absent"),
            Self::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}

/// Does the handler's field scope intersect any changed path?
///
/// Intersection is a segment-wise prefix relation in either direction:
/// a handler on `spec` sees a change of `spec.field`, and a handler on
/// `spec.struct.field` sees a whole-`spec` replacement. With no changed
/// paths at all, a scoped handler never matches.
fn matches_field(scope: &FieldPath, changed: &[FieldPath]) -> bool {
    changed
        .iter()
        .any(|path| path.starts_with(scope) || scope.starts_with(path))
}

/// Full relevance check of one handler against one cause.
///
/// `ignore_fields` drops the field-scope gate: finalizer decisions must
/// see field-scoped handlers even when nothing changed yet.
pub(crate) fn matches<C: Send + 'static>(
    handler: &ResourceHandler<C>,
    ctx: &FilterCtx<'_>,
    changed: &[FieldPath],
    ignore_fields: bool,
) -> bool {
    if !ignore_fields {
        if let Some(scope) = &handler.field {
            if !matches_field(scope, changed) {
                return false;
            }
        }
    }
    for (key, filter) in &handler.labels {
        if !filter.accepts(ctx.body.has_label(key), ctx.body.label(key), ctx) {
            return false;
        }
    }
    for (key, filter) in &handler.annotations {
        if !filter.accepts(ctx.body.has_annotation(key), ctx.body.annotation(key), ctx) {
            return false;
        }
    }
    if let Some(when) = &handler.when {
        if !when(ctx) {
            return false;
        }
    }
    true
}
