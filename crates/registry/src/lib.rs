//! Handler registries and cause matching for the reeve controller framework.
//!
//! This crate decides *which* handlers run for an observed event; executing
//! them is the reconciliation driver's job. Key pieces:
//!
//! - **Actions**: async callbacks wrapped with a stable identity token.
//! - **Handler records**: immutable registration data (id, reason, field
//!   scope, filters, error policy).
//! - **Causes**: why a handler might run, from lifecycle activities to
//!   interpreted object changes.
//! - **Registries**: ordered collections with filtered, deduplicated
//!   lookups, aggregated per resource kind by [`OperatorRegistry`].
//!
//! # Example
//!
//! ```ignore
//! use reeve_core::Resource;
//! use reeve_registry::{ChangingFn, HandlerOptions, OperatorRegistry};
//!
//! let registry = OperatorRegistry::new();
//! let widgets = Resource::new("example.com", "v1", "widgets");
//!
//! registry.on_create(
//!     &widgets,
//!     HandlerOptions::new().with_id("configure"),
//!     ChangingFn::new(|cause| async move {
//!         tracing::info!(name = ?cause.body.name(), "configuring widget");
//!         Ok(None)
//!     }),
//! )?;
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod action;
pub mod cause;
pub mod error;
pub mod filters;
pub mod handler;
pub mod operator;
pub mod registry;

// Re-export main types
pub use action::{
    Action, ActionFailure, ActionResult, ActivityFn, CallSite, CallbackToken, ChangingFn,
    HandlerFn, SpawningFn, WatchingFn,
};
pub use cause::{
    Activity, ActivityCause, FilterCtx, Reason, ResourceChangingCause, ResourceSpawningCause,
    ResourceWatchingCause, WatchEventType,
};
pub use error::RegistryError;
pub use filters::{MetaFilter, MetaPredicateFn, WhenFn};
pub use handler::{
    ActivityHandler, ChangingHandler, ErrorsMode, HandlerId, ResourceHandler, SpawningHandler,
    WatchingHandler,
};
pub use operator::{HandlerOptions, OperatorRegistry, SubRegistry};
pub use registry::{
    ActivityRegistry, HandlerIdSet, ResourceChangingRegistry, ResourceSpawningRegistry,
    ResourceWatchingRegistry,
};
