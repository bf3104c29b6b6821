//! Error types for lock operations.

use thiserror::Error;

/// Errors that can occur while acquiring, renewing or releasing a lease.
#[derive(Debug, Error)]
pub enum LockError {
    /// The coordinator cannot be reached. Transient; callers retry.
    #[error("lock service unavailable: {0}")]
    Unavailable(String),

    /// The lease is no longer held (expired or released).
    #[error("lease {token} on {namespace}/{key} is not held")]
    NotHeld {
        namespace: String,
        key: String,
        token: String,
    },

    /// `max_attempts` acquisitions failed in a row.
    #[error("gave up acquiring {namespace}/{key} after {attempts} attempts")]
    Exhausted {
        namespace: String,
        key: String,
        attempts: u32,
    },

    /// Invalid lock configuration.
    #[error("invalid lock configuration: {0}")]
    InvalidConfig(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for lock operations.
pub type Result<T> = std::result::Result<T, LockError>;
