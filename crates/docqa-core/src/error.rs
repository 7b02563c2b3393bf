//! Typed failure conditions for the retrieval core.
//!
//! Every variant is a distinct condition a caller can branch on, e.g. to
//! tell "no document processed" ([`CoreError::EmptyIndex`]) apart from a
//! failing embedding backend ([`CoreError::Embedding`]).

use thiserror::Error;

/// Result alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// Invalid parameters, rejected before any processing.
    #[error("invalid configuration: {0}")]
    Validation(String),

    /// Empty document text or blank query.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// A chunk embedded to a zero-norm (or non-finite) vector.
    #[error("chunk {chunk_index} produced a degenerate embedding vector and cannot be indexed")]
    DegenerateVector { chunk_index: usize },

    /// The query embedded to a zero-norm (or non-finite) vector.
    #[error("query produced a degenerate embedding vector")]
    DegenerateQuery,

    /// Retrieval attempted with nothing indexed.
    #[error("no chunks are indexed; process a document first")]
    EmptyIndex,

    /// The embedder returned vectors of inconsistent dimension.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Failure reported by the embedding backend, propagated unchanged.
    #[error("embedding failed: {0}")]
    Embedding(String),
}

impl CoreError {
    /// Short machine-readable code, used for error bodies and log fields.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation",
            CoreError::EmptyInput(_) => "empty_input",
            CoreError::DegenerateVector { .. } | CoreError::DegenerateQuery => "degenerate_vector",
            CoreError::EmptyIndex => "empty_index",
            CoreError::DimensionMismatch { .. } => "dimension_mismatch",
            CoreError::Embedding(_) => "embedding",
        }
    }
}
