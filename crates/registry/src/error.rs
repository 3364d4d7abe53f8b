//! Error types for handler registration.

use thiserror::Error;

/// Errors raised while registering handlers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The callback carries no derivable identity (no function name, no
    /// wrap site) and no explicit id was supplied with the registration.
    #[error("handler needs an explicit id: the callback has no derivable identity")]
    UnidentifiableHandler,
}
