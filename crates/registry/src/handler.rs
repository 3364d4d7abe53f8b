//! Handler identity and the immutable records registries store.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use reeve_core::FieldPath;

use crate::action::{CallbackToken, HandlerFn};
use crate::cause::{Activity, ActivityCause, Reason, ResourceChangingCause, ResourceSpawningCause, ResourceWatchingCause};
use crate::error::RegistryError;
use crate::filters::{MetaFilter, WhenFn};

/// Stable human-readable identifier of one registration.
///
/// Ids are hierarchical: sub-handler ids are composed as `parent/child`,
/// and field-scoped handlers get their dotted field path as a suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerId(String);

impl HandlerId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join an optional parent prefix, the main id, and an optional suffix
    /// with `/`, skipping empty parts.
    #[must_use]
    pub fn compose(prefix: Option<&HandlerId>, main: &str, suffix: Option<&str>) -> Self {
        let mut id = main.to_owned();
        if let Some(suffix) = suffix.filter(|suffix| !suffix.is_empty()) {
            id = format!("{id}/{suffix}");
        }
        if let Some(prefix) = prefix.filter(|prefix| !prefix.0.is_empty()) {
            id = format!("{}/{id}", prefix.0);
        }
        Self(id)
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for HandlerId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for HandlerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// How a handler's unclassified failures are treated by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorsMode {
    /// Log and move on.
    Ignored,
    /// Retry with the handler's backoff.
    Temporary,
    /// Stop retrying this handler for this object.
    Permanent,
}

impl ErrorsMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ignored => "ignored",
            Self::Temporary => "temporary",
            Self::Permanent => "permanent",
        }
    }
}

impl fmt::Display for ErrorsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derive the id for one registration: an explicit id wins, then the
/// callable's qualified name, then its wrap site. The suffix applies even
/// to explicit ids, so field scopes always show up in the id.
pub(crate) fn generate_id<C: Send + 'static>(
    action: &HandlerFn<C>,
    explicit: Option<&str>,
    prefix: Option<&HandlerId>,
    suffix: Option<&str>,
) -> Result<HandlerId, RegistryError> {
    let main = match explicit.filter(|id| !id.is_empty()) {
        Some(id) => id.to_owned(),
        None => match (action.name(), action.site()) {
            (Some(name), _) => name.to_owned(),
            (None, Some(site)) => format!("closure:{site}"),
            (None, None) => return Err(RegistryError::UnidentifiableHandler),
        },
    };
    Ok(HandlerId::compose(prefix, &main, suffix))
}

/// Record of one activity registration.
#[derive(Debug, Clone)]
pub struct ActivityHandler {
    pub id: HandlerId,
    pub action: HandlerFn<ActivityCause>,
    /// Which lifecycle phase this handler serves; `None` means all of them.
    pub activity: Option<Activity>,
    pub errors: Option<ErrorsMode>,
    pub timeout: Option<Duration>,
    pub retries: Option<u32>,
    pub backoff: Option<Duration>,
    /// Fallback handlers run only when no regular handler matched.
    pub fallback: bool,
}

impl ActivityHandler {
    pub(crate) fn token(&self) -> CallbackToken {
        self.action.token()
    }
}

/// Record of one resource-scoped registration, generic over its cause.
#[derive(Clone)]
pub struct ResourceHandler<C: Send + 'static> {
    pub id: HandlerId,
    pub action: HandlerFn<C>,
    /// Only run for this change reason; `None` means any reason.
    pub reason: Option<Reason>,
    /// Only run when the diff touches this field scope.
    pub field: Option<FieldPath>,
    /// Also run for changes discovered on startup rather than observed live.
    pub initial: bool,
    /// For initial handlers: still run when the object is marked for deletion.
    pub deleted: bool,
    /// The object must carry a finalizer while this handler is registered.
    pub requires_finalizer: bool,
    pub labels: HashMap<String, MetaFilter>,
    pub annotations: HashMap<String, MetaFilter>,
    pub when: Option<WhenFn>,
    pub errors: Option<ErrorsMode>,
    pub timeout: Option<Duration>,
    pub retries: Option<u32>,
    pub backoff: Option<Duration>,
}

impl<C: Send + 'static> ResourceHandler<C> {
    pub(crate) fn token(&self) -> CallbackToken {
        self.action.token()
    }
}

impl<C: Send + 'static> fmt::Debug for ResourceHandler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandler")
            .field("id", &self.id)
            .field("reason", &self.reason)
            .field("field", &self.field)
            .field("initial", &self.initial)
            .field("deleted", &self.deleted)
            .field("requires_finalizer", &self.requires_finalizer)
            .finish_non_exhaustive()
    }
}

/// Record stored for raw watch-event handlers.
pub type WatchingHandler = ResourceHandler<ResourceWatchingCause>;
/// Record stored for handlers spawned alongside a resource.
pub type SpawningHandler = ResourceHandler<ResourceSpawningCause>;
/// Record stored for interpreted change handlers.
pub type ChangingHandler = ResourceHandler<ResourceChangingCause>;
