use arca_crypto::DigestError;
use arca_index::IndexError;
use arca_lock::LockError;
use arca_store::StoreError;
use thiserror::Error;

/// Coarse classification of a [`ServiceError`].
///
/// Callers branch on this: fix the request, give up, restore and retry, or
/// escalate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    IntegrityViolation,
    /// Archived and not restored.
    Unavailable,
    Unimplemented,
    Internal,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("lock error: {0}")]
    Lock(#[from] LockError),

    #[error("digest error: {0}")]
    Digest(#[from] DigestError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Classify this error, looking through wrapped lower-level errors.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) | Self::PayloadTooLarge { .. } | Self::Config(_) => {
                ErrorKind::InvalidInput
            }
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::IntegrityViolation(_) => ErrorKind::IntegrityViolation,
            Self::Store(e) => match e {
                StoreError::NotFound(_) => ErrorKind::NotFound,
                StoreError::IntegrityViolation { .. } | StoreError::Malformed(_) => {
                    ErrorKind::IntegrityViolation
                }
                StoreError::Unavailable { .. } => ErrorKind::Unavailable,
                StoreError::PayloadTooLarge { .. } | StoreError::InvalidConfig(_) => {
                    ErrorKind::InvalidInput
                }
                _ => ErrorKind::Internal,
            },
            Self::Index(IndexError::NotFound(_)) => ErrorKind::NotFound,
            Self::Digest(e) => match e {
                DigestError::Unimplemented(_) => ErrorKind::Unimplemented,
                DigestError::IntegrityViolation { .. } | DigestError::AlgorithmMismatch { .. } => {
                    ErrorKind::IntegrityViolation
                }
                DigestError::SameAlgorithm(_) => ErrorKind::InvalidInput,
                DigestError::Io(_) => ErrorKind::Internal,
            },
            Self::Lock(LockError::InvalidConfig(_)) => ErrorKind::InvalidInput,
            Self::Index(_) | Self::Lock(_) | Self::Io(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
