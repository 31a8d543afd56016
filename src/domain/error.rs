//! Domain errors

use thiserror::Error;

/// Failures raised by persistence adapters.
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    /// A unique column (username) already holds the value being written.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Domain-level error types
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidPassword(String),

    #[error("{0}")]
    UsernameConflict(String),

    #[error("{0}")]
    AccessDenied(String),

    /// Any persistence failure other than the username conflict.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
