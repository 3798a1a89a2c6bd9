//! Error types for the retrieval core.
//!
//! Provider adapters, configuration and logging work with `anyhow::Result`;
//! everything a caller of the search operations can observe is a
//! [`RetrievalError`].

use thiserror::Error;

/// Errors surfaced by ingestion and search operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RetrievalError {
    /// The embedding provider failed while embedding a batch or a query.
    #[error("embedding provider failed: {0}")]
    EmbeddingFailure(String),

    /// A vector with an unexpected length reached the similarity computation.
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A query parameter was outside its valid range.
    #[error("invalid value for {name}: {value}")]
    InvalidParameter { name: &'static str, value: String },

    /// A document id was already present in the store or repeated in a batch.
    #[error("document id {id:?} is already present")]
    DuplicateDocument { id: String },

    /// A chunk could not be turned into a document.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// The operation was cancelled or its deadline elapsed.
    #[error("operation cancelled")]
    Cancelled,

    /// A spawned sub-task panicked or was aborted.
    #[error("task {0} did not complete")]
    TaskFailed(String),
}

impl RetrievalError {
    /// Wrap a provider error, keeping the full context chain in the message.
    pub fn embedding(err: anyhow::Error) -> Self {
        Self::EmbeddingFailure(format!("{err:#}"))
    }

    pub(crate) fn invalid(name: &'static str, value: impl ToString) -> Self {
        Self::InvalidParameter {
            name,
            value: value.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Check that a weight-like parameter lies in `[0, 1]` (NaN is rejected).
pub(crate) fn check_unit_interval(name: &'static str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(RetrievalError::invalid(name, value))
    }
}
