//! Error taxonomy shared by the core and its callers.

use thiserror::Error;

/// Errors raised by the core algorithms and the contracts around them.
///
/// Data-quality problems inside a corpus (missing embeddings, mixed
/// dimensionality) never surface here: the ranker skips them. These
/// variants cover programmer errors and boundary violations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Chunking parameters that cannot make progress (`overlap >= size`, `size == 0`).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A vector does not have the dimensionality the caller expected.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A document was submitted without a filename.
    #[error("document filename must not be empty")]
    EmptyFilename,
}
