//! Fire-and-forget posting: callers enqueue, a background task delivers.
//!
//! Reporting must never slow down or fail reconciliation, so the enqueue
//! side is synchronous and infallible. Delivery failures are logged with the
//! dropped event's context and the poster moves on.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use reeve_core::Body;

use crate::event::{EventType, ObjectEvent, ObjectRef};
use crate::sink::EventSink;

/// Enqueue side of the event pipeline. Cheap to clone; one per operator.
#[derive(Debug, Clone)]
pub struct EventReporter {
    tx: mpsc::UnboundedSender<ObjectEvent>,
}

impl EventReporter {
    /// Spawn the poster task draining into `sink`.
    ///
    /// The task drains outstanding events and exits once every reporter
    /// clone is dropped; await the handle during shutdown to flush.
    #[must_use]
    pub fn start(sink: Arc<dyn EventSink>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_poster(rx, sink));
        (Self { tx }, task)
    }

    /// Enqueue an event; never blocks and never fails the caller.
    pub fn post(&self, event: ObjectEvent) {
        if self.tx.send(event).is_err() {
            warn!("Event dropped: the poster task is gone");
        }
    }

    /// Post a `Normal` event about `body`.
    pub fn info(&self, body: &Body, reason: impl Into<String>, message: impl Into<String>) {
        self.post_about(body, EventType::Normal, reason, message);
    }

    /// Post a `Warning` event about `body`.
    pub fn warn(&self, body: &Body, reason: impl Into<String>, message: impl Into<String>) {
        self.post_about(body, EventType::Warning, reason, message);
    }

    /// Post an `Error` event about `body`.
    pub fn error(&self, body: &Body, reason: impl Into<String>, message: impl Into<String>) {
        self.post_about(body, EventType::Error, reason, message);
    }

    fn post_about(
        &self,
        body: &Body,
        event_type: EventType,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.post(ObjectEvent::new(
            ObjectRef::from_body(body),
            event_type,
            reason,
            message,
        ));
    }
}

async fn run_poster(mut rx: mpsc::UnboundedReceiver<ObjectEvent>, sink: Arc<dyn EventSink>) {
    while let Some(event) = rx.recv().await {
        if let Err(error) = sink.post(&event).await {
            warn!(
                reason = %event.reason,
                message = %event.message,
                %error,
                "Failed to post an event; the event is lost"
            );
        }
    }
    debug!("Event poster stopped: all reporters dropped");
}
