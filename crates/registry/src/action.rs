//! The async callback contract and the identity wrapper registries point at.
//!
//! A callback is wrapped exactly once into a [`HandlerFn`], which assigns it
//! a [`CallbackToken`]. The token survives cloning and re-registration, so
//! a callback registered under several registries is still recognized as
//! one callback when lookups deduplicate.

use std::fmt;
use std::panic::Location;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::cause::{ActivityCause, ResourceChangingCause, ResourceSpawningCause, ResourceWatchingCause};

/// Failure vocabulary interpreted by the execution driver against the
/// handler's error policy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionFailure {
    /// The handler should be retried after a delay.
    #[error("temporary failure, retry in {delay:?}: {message}")]
    Temporary { message: String, delay: Duration },
    /// The handler must not be retried for this object.
    #[error("permanent failure: {message}")]
    Permanent { message: String },
}

impl ActionFailure {
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(60);

    #[must_use]
    pub fn temporary(message: impl Into<String>) -> Self {
        Self::Temporary {
            message: message.into(),
            delay: Self::DEFAULT_RETRY_DELAY,
        }
    }

    #[must_use]
    pub fn temporary_after(message: impl Into<String>, delay: Duration) -> Self {
        Self::Temporary {
            message: message.into(),
            delay,
        }
    }

    #[must_use]
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent {
            message: message.into(),
        }
    }
}

/// Outcome of one handler invocation. A returned value is merged into the
/// object's recorded state by the execution driver.
pub type ActionResult = Result<Option<Value>, ActionFailure>;

/// One user-supplied callback, generic over the cause value it receives.
///
/// Implemented automatically for async functions and closures taking the
/// cause by value and returning an [`ActionResult`].
#[async_trait]
pub trait Action<C: Send + 'static>: Send + Sync {
    async fn call(&self, cause: C) -> ActionResult;
}

#[async_trait]
impl<C, F, Fut> Action<C> for F
where
    C: Send + 'static,
    F: Fn(C) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = ActionResult> + Send,
{
    async fn call(&self, cause: C) -> ActionResult {
        (self)(cause).await
    }
}

/// Identity assigned when a callback is first wrapped; the deduplication
/// key for lookups across registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackToken(u64);

impl CallbackToken {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Source position where a callback was wrapped, used to derive ids for
/// anonymous callables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    pub file: &'static str,
    pub line: u32,
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// A wrapped callback: the action plus the identity that survives cloning
/// and re-registration.
///
/// Registration operations return the same `HandlerFn` back, so one value
/// can be registered under several causes and still deduplicate to a
/// single invocation per lookup.
pub struct HandlerFn<C: Send + 'static> {
    token: CallbackToken,
    name: Option<String>,
    site: Option<CallSite>,
    action: Arc<dyn Action<C>>,
}

impl<C: Send + 'static> HandlerFn<C> {
    /// Wrap a callable, capturing the call site for anonymous closures.
    ///
    /// Named functions keep their qualified name; closures fall back to
    /// the position this wrap happened at.
    #[track_caller]
    pub fn new<A>(action: A) -> Self
    where
        A: Action<C> + 'static,
    {
        let caller = Location::caller();
        Self {
            token: CallbackToken::next(),
            name: qualified_name::<A>(),
            site: Some(CallSite {
                file: caller.file(),
                line: caller.line(),
            }),
            action: Arc::new(action),
        }
    }

    /// Wrap a callable under a caller-chosen name.
    #[track_caller]
    pub fn named<A>(name: impl Into<String>, action: A) -> Self
    where
        A: Action<C> + 'static,
    {
        let mut wrapped = Self::new(action);
        wrapped.name = Some(name.into());
        wrapped
    }

    /// Wrap an already-shared action object.
    ///
    /// No name or wrap site is derivable here, so registering the result
    /// requires an explicit id.
    #[must_use]
    pub fn from_arc(action: Arc<dyn Action<C>>) -> Self {
        Self {
            token: CallbackToken::next(),
            name: None,
            site: None,
            action,
        }
    }

    pub async fn call(&self, cause: C) -> ActionResult {
        self.action.call(cause).await
    }

    #[must_use]
    pub const fn token(&self) -> CallbackToken {
        self.token
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub const fn site(&self) -> Option<CallSite> {
        self.site
    }
}

impl<C: Send + 'static> Clone for HandlerFn<C> {
    fn clone(&self) -> Self {
        Self {
            token: self.token,
            name: self.name.clone(),
            site: self.site,
            action: Arc::clone(&self.action),
        }
    }
}

impl<C: Send + 'static> fmt::Debug for HandlerFn<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFn")
            .field("token", &self.token)
            .field("name", &self.name)
            .field("site", &self.site)
            .finish_non_exhaustive()
    }
}

/// Callback wrapped for process-lifecycle activities.
pub type ActivityFn = HandlerFn<ActivityCause>;
/// Callback wrapped for raw watch events.
pub type WatchingFn = HandlerFn<ResourceWatchingCause>;
/// Callback wrapped for handlers spawned alongside a resource.
pub type SpawningFn = HandlerFn<ResourceSpawningCause>;
/// Callback wrapped for interpreted change causes.
pub type ChangingFn = HandlerFn<ResourceChangingCause>;

fn qualified_name<A>() -> Option<String> {
    let raw = std::any::type_name::<A>();
    let anonymous = raw.is_empty() || raw.contains("{{closure}}") || raw.starts_with("fn(");
    (!anonymous).then(|| raw.to_owned())
}
