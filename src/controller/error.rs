//! Error types for the reconciliation engine.
//!
//! Defines a single error type with classification helpers so callers can
//! tell the recoverable cluster responses (conflict, not found) apart from
//! failures that should abort a cycle.

use thiserror::Error;

/// Error type for reconciliation operations
#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Database error while loading desired state
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid process configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Desired state row that cannot be turned into cluster objects
    #[error("Validation error: {0}")]
    Validation(String),

    /// Best-effort removal left objects behind
    #[error("Cleanup incomplete: {failed} object(s) could not be deleted")]
    Cleanup { failed: usize },
}

impl Error {
    /// HTTP-style status code carried by a Kubernetes API error
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Kube(kube::Error::Api(e)) => Some(e.code),
            _ => None,
        }
    }

    /// Check if this error indicates the object already exists
    pub fn is_conflict(&self) -> bool {
        self.status_code() == Some(409)
    }

    /// Check if this error indicates a not-found condition
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    /// Check if this error is expected to clear up on a later cycle
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube(e) => {
                // Retry on network errors, rate limiting, and server errors
                matches!(
                    e,
                    kube::Error::Api(api_err) if api_err.code >= 500 || api_err.code == 429
                ) || matches!(e, kube::Error::Service(_))
            }
            Error::Database(_) | Error::Cleanup { .. } => true,
            Error::Config(_) | Error::Validation(_) | Error::Serialization(_) => false,
        }
    }
}

/// Result type alias for reconciliation operations
pub type Result<T, E = Error> = std::result::Result<T, E>;
