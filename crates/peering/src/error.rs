//! Error types for peer coordination.

use thiserror::Error;

/// Errors raised by peering operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PeeringError {
    /// The shared record store failed or rejected an operation.
    #[error("peer store operation failed: {0}")]
    Store(String),
    /// The keepalive parameters do not form a usable cadence.
    #[error("invalid peering configuration: {0}")]
    InvalidConfig(String),
}

impl PeeringError {
    #[must_use]
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}
