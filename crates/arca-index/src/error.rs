//! Error types for metadata index operations.

use arca_types::ContentId;
use thiserror::Error;

/// Errors that can occur during metadata index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// No entry is recorded for this primary id.
    #[error("no metadata entry for {0}")]
    NotFound(ContentId),

    /// The index backend cannot be reached.
    #[error("metadata index unavailable: {0}")]
    Unavailable(String),

    /// A journal record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from a file-backed index.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;
