//! Common error types shared across crates.

use thiserror::Error;

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::NotFound`] → 404
/// - [`ServiceError::Internal`] → 500
///
/// The wrapped string is the exact message placed in the response body, so it
/// must never carry backend details.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The requested record does not exist, or the request could not name one.
    #[error("not found: {0}")]
    NotFound(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::NotFound(_) => 404,
            ServiceError::Internal(_) => 500,
        }
    }

    /// The caller-facing message, without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            ServiceError::NotFound(m) | ServiceError::Internal(m) => m,
        }
    }
}
