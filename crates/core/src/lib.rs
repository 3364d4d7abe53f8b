//! Foundational data model for the reeve controller framework.
//!
//! This crate defines the vocabulary shared by every other layer:
//!
//! - **Resources**: group/version/plural coordinates of served kinds.
//! - **Field paths**: dotted, segment-wise paths into object structure.
//! - **Bodies**: read access into raw observed object state.
//! - **Diffs**: field-level structural comparison of two observed states.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod body;
pub mod diff;
pub mod fields;
pub mod resource;

// Re-export main types
pub use body::Body;
pub use diff::{Diff, DiffItem, DiffOperation};
pub use fields::{resolve, FieldPath};
pub use resource::Resource;
