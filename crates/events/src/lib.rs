//! Object event reporting for reeve operators.
//!
//! Handlers and the framework announce progress as events attached to the
//! object being reconciled. Reporting is strictly auxiliary:
//!
//! - **Fire-and-forget**: posting never blocks or fails reconciliation
//! - **Background delivery**: a poster task drains the queue into a sink
//! - **Bounded messages**: over-long text is cut at the midpoint
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use reeve_events::{EventReporter, TracingEventSink};
//!
//! let (reporter, poster) = EventReporter::start(Arc::new(TracingEventSink::new()));
//! reporter.info(&body, "Ready", "All tasks reconciled");
//!
//! // On shutdown: drop every clone, then await the poster to flush.
//! drop(reporter);
//! poster.await?;
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod error;
pub mod event;
pub mod reporter;
pub mod sink;

// Re-export main types
pub use error::ReportError;
pub use event::{
    truncate_message, EventType, ObjectEvent, ObjectRef, CUT_INFIX, MAX_MESSAGE_LENGTH,
};
pub use reporter::EventReporter;
pub use sink::{EventSink, RecordingEventSink, TracingEventSink};
