//! Registry error types.

use thiserror::Error;

/// Errors returned by [`Registry`](crate::Registry) operations.
///
/// Every variant is returned before any state is touched, so a failed
/// call leaves the registry exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("target not found: {0}")]
    NotFound(String),

    #[error("target already exists: {0}")]
    AlreadyExists(String),

    #[error("probing interval must be positive for target: {0}")]
    InvalidInterval(String),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
