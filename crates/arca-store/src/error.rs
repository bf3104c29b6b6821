use arca_crypto::DigestError;
use arca_types::{ContentId, TypeError};

/// Errors from object encoding and storage backend operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object is not stored in any tier.
    #[error("object not found: {0}")]
    NotFound(ContentId),

    /// Stored bytes do not match their content id.
    #[error("integrity violation for {id}: {detail}")]
    IntegrityViolation { id: ContentId, detail: String },

    /// The object exists but sits in a cold tier that has not been restored.
    #[error("object {id} is unavailable: {reason}")]
    Unavailable { id: ContentId, reason: String },

    /// Payload exceeds the configured ceiling.
    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: u64, limit: u64 },

    /// The bytes cannot be decoded as an object.
    #[error("malformed object: {0}")]
    Malformed(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid backend or pool configuration.
    #[error("invalid storage configuration: {0}")]
    InvalidConfig(String),

    /// I/O error from the underlying storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Type(#[from] TypeError),
}

impl StoreError {
    /// Map a digest verification failure for `id` into a store error.
    pub fn from_digest(id: &ContentId, err: DigestError) -> Self {
        match err {
            DigestError::Io(e) => Self::Io(e),
            other => Self::IntegrityViolation {
                id: id.clone(),
                detail: other.to_string(),
            },
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
