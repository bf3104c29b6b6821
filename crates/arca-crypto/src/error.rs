use arca_types::{ContentId, DigestAlgorithm};

/// Errors from digest computation and verification.
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    /// The configured algorithm tag has no implementation.
    #[error("digest algorithm not implemented: {0}")]
    Unimplemented(String),

    /// Recomputed digest differs from the expected one.
    #[error("integrity violation: expected {expected}, computed {computed}")]
    IntegrityViolation {
        expected: ContentId,
        computed: ContentId,
    },

    /// The expected id was produced by a different algorithm.
    #[error("cannot verify {expected} with {digester} digester")]
    AlgorithmMismatch {
        expected: ContentId,
        digester: DigestAlgorithm,
    },

    /// Primary and secondary algorithms must be independent.
    #[error("primary and secondary digests must differ, both are {0}")]
    SameAlgorithm(DigestAlgorithm),

    /// I/O error while reading a stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for digest operations.
pub type DigestResult<T> = Result<T, DigestError>;
