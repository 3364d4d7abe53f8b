//! The top-level aggregate registry and its registration surface.
//!
//! One [`OperatorRegistry`] holds the activity registry plus per-resource
//! watching, spawning, and changing registries, created lazily on first
//! registration. Registration methods take `&self` and hand the wrapped
//! callback back, so one callback can be registered under several causes
//! and still deduplicate to a single invocation per lookup.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use reeve_core::{FieldPath, Resource};

use crate::action::{ActivityFn, ChangingFn, SpawningFn, WatchingFn};
use crate::cause::{Activity, ActivityCause, FilterCtx, Reason, ResourceChangingCause, ResourceSpawningCause, ResourceWatchingCause};
use crate::error::RegistryError;
use crate::filters::{MetaFilter, WhenFn};
use crate::handler::{generate_id, ActivityHandler, ChangingHandler, ErrorsMode, HandlerId, ResourceHandler, SpawningHandler, WatchingHandler};
use crate::registry::{ActivityRegistry, HandlerIdSet, ResourceChangingRegistry, ResourceSpawningRegistry, ResourceWatchingRegistry};

/// Options accepted by every registration operation.
///
/// All options are optional; registration derives whatever is absent.
#[derive(Clone, Default)]
pub struct HandlerOptions {
    id: Option<String>,
    labels: HashMap<String, MetaFilter>,
    annotations: HashMap<String, MetaFilter>,
    when: Option<WhenFn>,
    errors: Option<ErrorsMode>,
    timeout: Option<Duration>,
    retries: Option<u32>,
    backoff: Option<Duration>,
    optional: bool,
    deleted: bool,
}

impl HandlerOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, filter: MetaFilter) -> Self {
        self.labels.insert(key.into(), filter);
        self
    }

    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, filter: MetaFilter) -> Self {
        self.annotations.insert(key.into(), filter);
        self
    }

    #[must_use]
    pub fn with_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&FilterCtx<'_>) -> bool + Send + Sync + 'static,
    {
        self.when = Some(Arc::new(predicate));
        self
    }

    #[must_use]
    pub fn with_errors(mut self, errors: ErrorsMode) -> Self {
        self.errors = Some(errors);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// Deletion and spawning handlers: run best-effort, without obligating
    /// a finalizer on the object.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Resumption handlers: also run when the object is already marked
    /// for deletion.
    #[must_use]
    pub fn with_deleted(mut self) -> Self {
        self.deleted = true;
        self
    }
}

impl fmt::Debug for HandlerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerOptions")
            .field("id", &self.id)
            .field("labels", &self.labels)
            .field("annotations", &self.annotations)
            .field("errors", &self.errors)
            .field("optional", &self.optional)
            .field("deleted", &self.deleted)
            .finish_non_exhaustive()
    }
}

/// The aggregate of all registries one operator consults.
#[derive(Debug, Default)]
pub struct OperatorRegistry {
    activity: ActivityRegistry,
    watching: RwLock<HashMap<Resource, Arc<ResourceWatchingRegistry>>>,
    spawning: RwLock<HashMap<Resource, Arc<ResourceSpawningRegistry>>>,
    changing: RwLock<HashMap<Resource, Arc<ResourceChangingRegistry>>>,
}

impl OperatorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-seeded with fallback authentication handlers for the
    /// client integrations the embedding process provides. Fallback logins
    /// run only when no user-registered login matched, and their failures
    /// are ignored so one broken integration cannot abort startup.
    pub fn with_fallback_logins<I>(logins: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = ActivityFn>,
    {
        let registry = Self::new();
        for login in logins {
            let id = generate_id(&login, None, None, None)?;
            registry.activity.append(ActivityHandler {
                id,
                action: login,
                activity: Some(Activity::Authentication),
                errors: Some(ErrorsMode::Ignored),
                timeout: None,
                retries: None,
                backoff: None,
                fallback: true,
            });
        }
        Ok(registry)
    }

    /// Register a handler for process-lifecycle activities; `None` serves
    /// every activity.
    pub fn on_activity(
        &self,
        activity: Option<Activity>,
        options: HandlerOptions,
        action: ActivityFn,
    ) -> Result<ActivityFn, RegistryError> {
        let id = generate_id(&action, options.id.as_deref(), None, None)?;
        self.activity.append(ActivityHandler {
            id,
            action: action.clone(),
            activity,
            errors: options.errors,
            timeout: options.timeout,
            retries: options.retries,
            backoff: options.backoff,
            fallback: false,
        });
        Ok(action)
    }

    /// Register a low-level handler for raw watch events of a resource.
    pub fn on_event(
        &self,
        resource: &Resource,
        options: HandlerOptions,
        action: WatchingFn,
    ) -> Result<WatchingFn, RegistryError> {
        let id = generate_id(&action, options.id.as_deref(), None, None)?;
        self.watching_registry(resource).append(ResourceHandler {
            id,
            action: action.clone(),
            reason: None,
            field: None,
            initial: false,
            deleted: false,
            requires_finalizer: false,
            labels: options.labels,
            annotations: options.annotations,
            when: options.when,
            errors: options.errors,
            timeout: options.timeout,
            retries: options.retries,
            backoff: options.backoff,
        });
        Ok(action)
    }

    /// Register a handler spawned alongside each matching object. These
    /// obligate a finalizer unless marked optional: the object must not
    /// vanish while its spawned handler is still being stopped.
    pub fn on_spawning(
        &self,
        resource: &Resource,
        options: HandlerOptions,
        action: SpawningFn,
    ) -> Result<SpawningFn, RegistryError> {
        let id = generate_id(&action, options.id.as_deref(), None, None)?;
        let requires_finalizer = !options.optional;
        self.spawning_registry(resource).append(ResourceHandler {
            id,
            action: action.clone(),
            reason: None,
            field: None,
            initial: false,
            deleted: false,
            requires_finalizer,
            labels: options.labels,
            annotations: options.annotations,
            when: options.when,
            errors: options.errors,
            timeout: options.timeout,
            retries: options.retries,
            backoff: options.backoff,
        });
        Ok(action)
    }

    /// Register a handler for object creation.
    pub fn on_create(
        &self,
        resource: &Resource,
        options: HandlerOptions,
        action: ChangingFn,
    ) -> Result<ChangingFn, RegistryError> {
        self.register_changing(resource, Some(Reason::Create), None, false, false, options, action)
    }

    /// Register a handler for object updates.
    pub fn on_update(
        &self,
        resource: &Resource,
        options: HandlerOptions,
        action: ChangingFn,
    ) -> Result<ChangingFn, RegistryError> {
        self.register_changing(resource, Some(Reason::Update), None, false, false, options, action)
    }

    /// Register a handler for object deletion.
    ///
    /// Deletion handlers obligate a finalizer unless marked optional,
    /// guaranteeing they run before the object is released.
    pub fn on_delete(
        &self,
        resource: &Resource,
        options: HandlerOptions,
        action: ChangingFn,
    ) -> Result<ChangingFn, RegistryError> {
        let requires_finalizer = !options.optional;
        self.register_changing(
            resource,
            Some(Reason::Delete),
            None,
            false,
            requires_finalizer,
            options,
            action,
        )
    }

    /// Register a handler for changes discovered on operator startup,
    /// regardless of their reason.
    pub fn on_resume(
        &self,
        resource: &Resource,
        options: HandlerOptions,
        action: ChangingFn,
    ) -> Result<ChangingFn, RegistryError> {
        self.register_changing(resource, None, None, true, false, options, action)
    }

    /// Register a handler scoped to one dotted field path; it runs for any
    /// reason whenever the diff touches that scope, and its id carries the
    /// path as a suffix.
    pub fn on_field(
        &self,
        resource: &Resource,
        field: &str,
        options: HandlerOptions,
        action: ChangingFn,
    ) -> Result<ChangingFn, RegistryError> {
        let path = FieldPath::parse(field);
        let scope = (!path.is_root()).then_some(path);
        self.register_changing(resource, None, scope, false, false, options, action)
    }

    /// Resource kinds with at least one registered handler of any kind.
    #[must_use]
    pub fn resources(&self) -> HashSet<Resource> {
        let mut resources = HashSet::new();
        resources.extend(read_map(&self.watching).keys().cloned());
        resources.extend(read_map(&self.spawning).keys().cloned());
        resources.extend(read_map(&self.changing).keys().cloned());
        resources
    }

    #[must_use]
    pub fn activity(&self) -> &ActivityRegistry {
        &self.activity
    }

    /// The watching registry for a resource, if anything was registered.
    #[must_use]
    pub fn watching(&self, resource: &Resource) -> Option<Arc<ResourceWatchingRegistry>> {
        read_map(&self.watching).get(resource).cloned()
    }

    #[must_use]
    pub fn spawning(&self, resource: &Resource) -> Option<Arc<ResourceSpawningRegistry>> {
        read_map(&self.spawning).get(resource).cloned()
    }

    #[must_use]
    pub fn changing(&self, resource: &Resource) -> Option<Arc<ResourceChangingRegistry>> {
        read_map(&self.changing).get(resource).cloned()
    }

    /// Deduplicated activity handlers for the cause.
    #[must_use]
    pub fn activity_handlers(
        &self,
        cause: &ActivityCause,
        excluded: &HandlerIdSet,
    ) -> Vec<Arc<ActivityHandler>> {
        self.activity.get_handlers(cause, excluded)
    }

    /// Deduplicated watching handlers for the cause's resource.
    #[must_use]
    pub fn watching_handlers(
        &self,
        cause: &ResourceWatchingCause,
        excluded: &HandlerIdSet,
    ) -> Vec<Arc<WatchingHandler>> {
        self.watching(&cause.resource)
            .map(|registry| registry.get_handlers(cause, excluded))
            .unwrap_or_default()
    }

    /// Deduplicated spawning handlers for the cause's resource.
    #[must_use]
    pub fn spawning_handlers(
        &self,
        cause: &ResourceSpawningCause,
        excluded: &HandlerIdSet,
    ) -> Vec<Arc<SpawningHandler>> {
        self.spawning(&cause.resource)
            .map(|registry| registry.get_handlers(cause, excluded))
            .unwrap_or_default()
    }

    /// Deduplicated changing handlers for the cause's resource.
    #[must_use]
    pub fn changing_handlers(
        &self,
        cause: &ResourceChangingCause,
        excluded: &HandlerIdSet,
    ) -> Vec<Arc<ChangingHandler>> {
        self.changing(&cause.resource)
            .map(|registry| registry.get_handlers(cause, excluded))
            .unwrap_or_default()
    }

    /// Whether the object must carry a finalizer: true when any matching
    /// spawning or changing handler still obligates one.
    #[must_use]
    pub fn requires_finalizer(
        &self,
        cause: &ResourceSpawningCause,
        excluded: &HandlerIdSet,
    ) -> bool {
        self.spawning(&cause.resource)
            .is_some_and(|registry| registry.requires_finalizer(cause, excluded))
            || self
                .changing(&cause.resource)
                .is_some_and(|registry| registry.requires_finalizer(cause, excluded))
    }

    /// All field paths watched by the resource's changing handlers.
    #[must_use]
    pub fn extra_fields(&self, resource: &Resource) -> HashSet<FieldPath> {
        self.changing(resource)
            .map(|registry| registry.get_extra_fields())
            .unwrap_or_default()
    }

    #[allow(clippy::too_many_arguments)]
    fn register_changing(
        &self,
        resource: &Resource,
        reason: Option<Reason>,
        field: Option<FieldPath>,
        initial: bool,
        requires_finalizer: bool,
        options: HandlerOptions,
        action: ChangingFn,
    ) -> Result<ChangingFn, RegistryError> {
        let suffix = field.as_ref().map(ToString::to_string);
        let id = generate_id(&action, options.id.as_deref(), None, suffix.as_deref())?;
        self.changing_registry(resource).append(ResourceHandler {
            id,
            action: action.clone(),
            reason,
            field,
            initial,
            deleted: options.deleted,
            requires_finalizer,
            labels: options.labels,
            annotations: options.annotations,
            when: options.when,
            errors: options.errors,
            timeout: options.timeout,
            retries: options.retries,
            backoff: options.backoff,
        });
        Ok(action)
    }

    fn watching_registry(&self, resource: &Resource) -> Arc<ResourceWatchingRegistry> {
        write_map(&self.watching)
            .entry(resource.clone())
            .or_default()
            .clone()
    }

    fn spawning_registry(&self, resource: &Resource) -> Arc<ResourceSpawningRegistry> {
        write_map(&self.spawning)
            .entry(resource.clone())
            .or_default()
            .clone()
    }

    fn changing_registry(&self, resource: &Resource) -> Arc<ResourceChangingRegistry> {
        write_map(&self.changing)
            .entry(resource.clone())
            .or_default()
            .clone()
    }
}

/// Prefix-composing registry handed to a running handler so it can plant
/// sub-handlers under its own id for the current cause.
#[derive(Debug)]
pub struct SubRegistry {
    prefix: HandlerId,
    registry: ResourceChangingRegistry,
}

impl SubRegistry {
    /// A sub-registry whose registrations are namespaced under the parent
    /// handler's id.
    #[must_use]
    pub fn new(parent: HandlerId) -> Self {
        Self {
            prefix: parent,
            registry: ResourceChangingRegistry::new(),
        }
    }

    /// Register a sub-handler; its id becomes `parent/child`. Sub-handlers
    /// never obligate finalizers themselves: the parent owns that policy.
    pub fn register(
        &self,
        options: HandlerOptions,
        action: ChangingFn,
    ) -> Result<ChangingFn, RegistryError> {
        let id = generate_id(&action, options.id.as_deref(), Some(&self.prefix), None)?;
        self.registry.append(ResourceHandler {
            id,
            action: action.clone(),
            reason: None,
            field: None,
            initial: false,
            deleted: options.deleted,
            requires_finalizer: false,
            labels: options.labels,
            annotations: options.annotations,
            when: options.when,
            errors: options.errors,
            timeout: options.timeout,
            retries: options.retries,
            backoff: options.backoff,
        });
        Ok(action)
    }

    #[must_use]
    pub fn prefix(&self) -> &HandlerId {
        &self.prefix
    }

    /// The underlying registry the driver drains for the current cause.
    #[must_use]
    pub fn registry(&self) -> &ResourceChangingRegistry {
        &self.registry
    }
}

fn read_map<K, V>(lock: &RwLock<HashMap<K, V>>) -> std::sync::RwLockReadGuard<'_, HashMap<K, V>> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_map<K, V>(lock: &RwLock<HashMap<K, V>>) -> std::sync::RwLockWriteGuard<'_, HashMap<K, V>> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
