//! Why a handler runs: lifecycle phases, change reasons, and the cause
//! values an execution driver builds per observed event.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use reeve_core::{Body, Diff, Resource};

/// Process-lifecycle phase served by activity handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    Startup,
    Authentication,
    Probe,
    Cleanup,
}

impl Activity {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Authentication => "authentication",
            Self::Probe => "probe",
            Self::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// High-level interpretation of an observed change, decided by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reason {
    Create,
    Update,
    Delete,
}

impl Reason {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw watch-stream event type, before any interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WatchEventType {
    Added,
    Modified,
    Deleted,
}

impl WatchEventType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "ADDED",
            Self::Modified => "MODIFIED",
            Self::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for WatchEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cause for one process-lifecycle activity run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityCause {
    pub activity: Activity,
}

impl ActivityCause {
    #[must_use]
    pub const fn new(activity: Activity) -> Self {
        Self { activity }
    }
}

/// Cause for low-level watch handlers: one raw event, no interpretation,
/// no field scoping.
#[derive(Debug, Clone)]
pub struct ResourceWatchingCause {
    pub resource: Resource,
    pub body: Body,
    pub event_type: WatchEventType,
}

impl ResourceWatchingCause {
    #[must_use]
    pub fn new(resource: Resource, body: Body, event_type: WatchEventType) -> Self {
        Self {
            resource,
            body,
            event_type,
        }
    }

    #[must_use]
    pub fn filter_ctx(&self) -> FilterCtx<'_> {
        FilterCtx {
            resource: &self.resource,
            body: &self.body,
            reason: None,
            initial: false,
            deleted: false,
            diff: None,
            old: None,
            new: None,
        }
    }
}

/// Pre-cause built before a change is interpreted, used to decide whether
/// the object must be protected by a finalizer.
#[derive(Debug, Clone)]
pub struct ResourceSpawningCause {
    pub resource: Resource,
    pub body: Body,
}

impl ResourceSpawningCause {
    #[must_use]
    pub fn new(resource: Resource, body: Body) -> Self {
        Self { resource, body }
    }

    #[must_use]
    pub fn filter_ctx(&self) -> FilterCtx<'_> {
        FilterCtx {
            resource: &self.resource,
            body: &self.body,
            reason: None,
            initial: false,
            deleted: false,
            diff: None,
            old: None,
            new: None,
        }
    }
}

/// Fully-interpreted change cause dispatched to change handlers.
#[derive(Debug, Clone)]
pub struct ResourceChangingCause {
    pub resource: Resource,
    pub body: Body,
    pub reason: Reason,
    /// The change was discovered on startup, not observed live.
    pub initial: bool,
    /// The object is already marked for deletion.
    pub deleted: bool,
    pub diff: Diff,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

impl ResourceChangingCause {
    #[must_use]
    pub fn new(resource: Resource, body: Body, reason: Reason) -> Self {
        Self {
            resource,
            body,
            reason,
            initial: false,
            deleted: false,
            diff: Diff::empty(),
            old: None,
            new: None,
        }
    }

    #[must_use]
    pub fn with_initial(mut self, initial: bool) -> Self {
        self.initial = initial;
        self
    }

    #[must_use]
    pub fn with_deleted(mut self, deleted: bool) -> Self {
        self.deleted = deleted;
        self
    }

    #[must_use]
    pub fn with_diff(mut self, diff: Diff) -> Self {
        self.diff = diff;
        self
    }

    #[must_use]
    pub fn with_old(mut self, old: Value) -> Self {
        self.old = Some(old);
        self
    }

    #[must_use]
    pub fn with_new(mut self, new: Value) -> Self {
        self.new = Some(new);
        self
    }

    #[must_use]
    pub fn filter_ctx(&self) -> FilterCtx<'_> {
        FilterCtx {
            resource: &self.resource,
            body: &self.body,
            reason: Some(self.reason),
            initial: self.initial,
            deleted: self.deleted,
            diff: Some(&self.diff),
            old: self.old.as_ref(),
            new: self.new.as_ref(),
        }
    }
}

/// Borrowed view over a cause, built once per lookup and shared by every
/// label, annotation, and `when` predicate evaluated for that lookup.
#[derive(Debug, Clone, Copy)]
pub struct FilterCtx<'a> {
    pub resource: &'a Resource,
    pub body: &'a Body,
    pub reason: Option<Reason>,
    pub initial: bool,
    pub deleted: bool,
    pub diff: Option<&'a Diff>,
    pub old: Option<&'a Value>,
    pub new: Option<&'a Value>,
}
