//! Delivery targets for posted events.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::ReportError;
use crate::event::ObjectEvent;

/// Where the poster delivers events.
///
/// Cluster-API sinks belong to the embedding application; this crate ships a
/// log-backed sink and a recording sink for tests.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn post(&self, event: &ObjectEvent) -> Result<(), ReportError>;
}

/// Writes every event to the log stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl TracingEventSink {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventSink for TracingEventSink {
    async fn post(&self, event: &ObjectEvent) -> Result<(), ReportError> {
        info!(
            kind = event.object.kind.as_deref().unwrap_or(""),
            name = event.object.name.as_deref().unwrap_or(""),
            namespace = event.object.namespace.as_deref().unwrap_or(""),
            event_type = event.event_type.as_str(),
            reason = %event.reason,
            message = %event.message,
            "Object event"
        );
        Ok(())
    }
}

/// Collects events for inspection in tests.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: RwLock<Vec<ObjectEvent>>,
}

impl RecordingEventSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything delivered so far.
    pub async fn events(&self) -> Vec<ObjectEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn post(&self, event: &ObjectEvent) -> Result<(), ReportError> {
        self.events.write().await.push(event.clone());
        Ok(())
    }
}
