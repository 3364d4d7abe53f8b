//! Error types for event delivery.

use thiserror::Error;

/// Raised by sinks when an event cannot be delivered.
///
/// The poster downgrades these to warnings; reporting is auxiliary and must
/// never abort the reconciliation that produced the event.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The sink rejected or failed to deliver the event.
    #[error("event delivery failed: {0}")]
    Post(String),
}

impl ReportError {
    pub fn post(message: impl Into<String>) -> Self {
        Self::Post(message.into())
    }
}
