use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid digest length for {algorithm}: expected {expected}, got {actual}")]
    InvalidLength {
        algorithm: String,
        expected: usize,
        actual: usize,
    },

    #[error("unknown digest algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("unknown object type tag: {0:#04x}")]
    UnknownObjectType(u8),

    #[error("malformed content id: {0}")]
    MalformedId(String),
}
