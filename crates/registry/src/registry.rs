//! Ordered, filterable collections of handler records, one per cause kind.
//!
//! Registration preserves insertion order; lookups return snapshots, so a
//! long handler execution never holds a registry lock. Deduplication keys
//! on the callback token: the same callback registered twice (even under
//! different ids) is returned once per lookup.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use itertools::Itertools;
use tracing::debug;

use reeve_core::FieldPath;

use crate::cause::{ActivityCause, ResourceChangingCause, ResourceSpawningCause, ResourceWatchingCause};
use crate::filters;
use crate::handler::{ActivityHandler, ChangingHandler, HandlerId, SpawningHandler, WatchingHandler};

/// Ids of handlers already completed for a cause, skipped by lookups.
pub type HandlerIdSet = HashSet<HandlerId>;

/// Registry of process-lifecycle handlers with fallback semantics.
#[derive(Debug, Default)]
pub struct ActivityRegistry {
    handlers: RwLock<Vec<Arc<ActivityHandler>>>,
}

impl ActivityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, handler: ActivityHandler) {
        debug!(handler = %handler.id, activity = ?handler.activity, "Registered activity handler");
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(handler));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Matching handlers in registration order, without deduplication.
    ///
    /// Regular handlers win: fallbacks are consulted only when no regular
    /// handler matched the requested activity.
    #[must_use]
    pub fn iter_handlers(
        &self,
        cause: &ActivityCause,
        excluded: &HandlerIdSet,
    ) -> Vec<Arc<ActivityHandler>> {
        let snapshot = self.snapshot();
        let matching = |handler: &&Arc<ActivityHandler>| {
            !excluded.contains(&handler.id)
                && (handler.activity.is_none() || handler.activity == Some(cause.activity))
        };
        let regular: Vec<_> = snapshot
            .iter()
            .filter(|handler| !handler.fallback)
            .filter(matching)
            .cloned()
            .collect();
        if !regular.is_empty() {
            return regular;
        }
        snapshot
            .iter()
            .filter(|handler| handler.fallback)
            .filter(matching)
            .cloned()
            .collect()
    }

    /// Matching handlers, deduplicated by callback token, in registration order.
    #[must_use]
    pub fn get_handlers(
        &self,
        cause: &ActivityCause,
        excluded: &HandlerIdSet,
    ) -> Vec<Arc<ActivityHandler>> {
        self.iter_handlers(cause, excluded)
            .into_iter()
            .unique_by(|handler| handler.token())
            .collect()
    }

    fn snapshot(&self) -> Vec<Arc<ActivityHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Registry of raw watch-event handlers for one resource kind.
#[derive(Debug, Default)]
pub struct ResourceWatchingRegistry {
    handlers: RwLock<Vec<Arc<WatchingHandler>>>,
}

impl ResourceWatchingRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, handler: WatchingHandler) {
        debug!(handler = %handler.id, "Registered watching handler");
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(handler));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Matching handlers in registration order; raw events have no diff,
    /// so field scopes are not consulted here.
    #[must_use]
    pub fn iter_handlers(
        &self,
        cause: &ResourceWatchingCause,
        excluded: &HandlerIdSet,
    ) -> Vec<Arc<WatchingHandler>> {
        let ctx = cause.filter_ctx();
        self.snapshot()
            .into_iter()
            .filter(|handler| {
                !excluded.contains(&handler.id) && filters::matches(handler, &ctx, &[], true)
            })
            .collect()
    }

    #[must_use]
    pub fn get_handlers(
        &self,
        cause: &ResourceWatchingCause,
        excluded: &HandlerIdSet,
    ) -> Vec<Arc<WatchingHandler>> {
        self.iter_handlers(cause, excluded)
            .into_iter()
            .unique_by(|handler| handler.token())
            .collect()
    }

    fn snapshot(&self) -> Vec<Arc<WatchingHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Registry of handlers spawned alongside a resource for one resource kind.
#[derive(Debug, Default)]
pub struct ResourceSpawningRegistry {
    handlers: RwLock<Vec<Arc<SpawningHandler>>>,
}

impl ResourceSpawningRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, handler: SpawningHandler) {
        debug!(handler = %handler.id, "Registered spawning handler");
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(handler));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn iter_handlers(
        &self,
        cause: &ResourceSpawningCause,
        excluded: &HandlerIdSet,
    ) -> Vec<Arc<SpawningHandler>> {
        let ctx = cause.filter_ctx();
        self.snapshot()
            .into_iter()
            .filter(|handler| {
                !excluded.contains(&handler.id) && filters::matches(handler, &ctx, &[], true)
            })
            .collect()
    }

    #[must_use]
    pub fn get_handlers(
        &self,
        cause: &ResourceSpawningCause,
        excluded: &HandlerIdSet,
    ) -> Vec<Arc<SpawningHandler>> {
        self.iter_handlers(cause, excluded)
            .into_iter()
            .unique_by(|handler| handler.token())
            .collect()
    }

    /// True when any matching, non-excluded handler obligates a finalizer.
    /// Field scopes are ignored: the obligation exists before any change.
    #[must_use]
    pub fn requires_finalizer(
        &self,
        cause: &ResourceSpawningCause,
        excluded: &HandlerIdSet,
    ) -> bool {
        let ctx = cause.filter_ctx();
        self.snapshot().iter().any(|handler| {
            handler.requires_finalizer
                && !excluded.contains(&handler.id)
                && filters::matches(handler, &ctx, &[], true)
        })
    }

    fn snapshot(&self) -> Vec<Arc<SpawningHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Registry of interpreted change handlers for one resource kind.
#[derive(Debug, Default)]
pub struct ResourceChangingRegistry {
    handlers: RwLock<Vec<Arc<ChangingHandler>>>,
}

impl ResourceChangingRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, handler: ChangingHandler) {
        debug!(handler = %handler.id, reason = ?handler.reason, "Registered changing handler");
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(handler));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Matching handlers in registration order, gated by reason, initial
    /// marking, deletion opt-in, and the general match conditions.
    #[must_use]
    pub fn iter_handlers(
        &self,
        cause: &ResourceChangingCause,
        excluded: &HandlerIdSet,
    ) -> Vec<Arc<ChangingHandler>> {
        let ctx = cause.filter_ctx();
        let changed: Vec<FieldPath> = cause.diff.touched_fields().cloned().collect();
        self.snapshot()
            .into_iter()
            .filter(|handler| {
                if excluded.contains(&handler.id) {
                    return false;
                }
                if handler.reason.is_some_and(|reason| reason != cause.reason) {
                    return false;
                }
                if handler.initial && !cause.initial {
                    return false;
                }
                if handler.initial && cause.deleted && !handler.deleted {
                    return false;
                }
                filters::matches(handler, &ctx, &changed, false)
            })
            .collect()
    }

    #[must_use]
    pub fn get_handlers(
        &self,
        cause: &ResourceChangingCause,
        excluded: &HandlerIdSet,
    ) -> Vec<Arc<ChangingHandler>> {
        self.iter_handlers(cause, excluded)
            .into_iter()
            .unique_by(|handler| handler.token())
            .collect()
    }

    /// Same policy as the spawning registry: any matching, non-excluded
    /// handler with the obligation, regardless of field scope.
    #[must_use]
    pub fn requires_finalizer(
        &self,
        cause: &ResourceSpawningCause,
        excluded: &HandlerIdSet,
    ) -> bool {
        let ctx = cause.filter_ctx();
        self.snapshot().iter().any(|handler| {
            handler.requires_finalizer
                && !excluded.contains(&handler.id)
                && filters::matches(handler, &ctx, &[], true)
        })
    }

    /// Every field path any registered handler watches; the driver uses
    /// this to decide which fields need diff tracking at all.
    #[must_use]
    pub fn get_extra_fields(&self) -> HashSet<FieldPath> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(|handler| handler.field.clone())
            .collect()
    }

    fn snapshot(&self) -> Vec<Arc<ChangingHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
