//! Errors raised while reading serialized sketches.

use thiserror::Error;

/// Failure to interpret a buffer as a serialized sketch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid sketch length: expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("overflow bucket {0} is out of range")]
    OverflowBucket(u16),

    #[error("non-zero register count {0} exceeds number of buckets")]
    NonZeroCount(u16),
}
