#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

//! # REEVE
//!
//! Embeddable cluster-controller framework: handler registries, cause
//! matching, peer coordination, and audit events.
//!
//! This library re-exports all reeve workspace crates for convenience.

// Re-export all crates
pub use reeve_core;
pub use reeve_events;
pub use reeve_peering;
pub use reeve_registry;

pub mod prelude;
