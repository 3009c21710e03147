use crate::constants::DimValidationError;
use crate::embedding::EmbeddingError;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by the RAM cache and the cached store facade.
pub enum CacheError {
    /// No slot could be obtained, even after eviction.
    #[error(
        "arena exhausted: {live_documents} live documents, {slot_capacity} slots, max {max_documents} documents"
    )]
    Capacity {
        /// Documents live at the time of the failure.
        live_documents: usize,
        /// Slots the vector region can hold.
        slot_capacity: usize,
        /// Configured document ceiling.
        max_documents: usize,
    },

    /// Embedding length differs from the configured dimension.
    #[error("invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured dimension.
        expected: usize,
        /// Offending length.
        actual: usize,
    },

    /// Chunk and embedding batches have different lengths.
    #[error("batch length mismatch: {chunks} chunks, {embeddings} embeddings")]
    LengthMismatch {
        /// Number of chunks.
        chunks: usize,
        /// Number of embeddings.
        embeddings: usize,
    },

    /// The embedding source failed.
    #[error("embedding source error: {0}")]
    EmbeddingSource(#[from] EmbeddingError),

    /// The persistent fallback store failed on a path where it was the only store attempted.
    #[error("fallback store error: {message}")]
    Fallback {
        /// Error message from the store.
        message: String,
    },

    /// The RAM cache state is unusable (e.g. poisoned by a panic mid-mutation).
    #[error("RAM cache unavailable: {reason}")]
    Unavailable {
        /// Error message.
        reason: String,
    },

    /// Invalid configuration.
    #[error("configuration error: {reason}")]
    Config {
        /// Error message.
        reason: String,
    },
}

/// Stable discriminant of a [`CacheError`], for callers that branch on the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheErrorKind {
    Capacity,
    DimensionMismatch,
    LengthMismatch,
    EmbeddingSource,
    Fallback,
    Unavailable,
    Config,
}

impl CacheError {
    pub fn kind(&self) -> CacheErrorKind {
        match self {
            CacheError::Capacity { .. } => CacheErrorKind::Capacity,
            CacheError::DimensionMismatch { .. } => CacheErrorKind::DimensionMismatch,
            CacheError::LengthMismatch { .. } => CacheErrorKind::LengthMismatch,
            CacheError::EmbeddingSource(_) => CacheErrorKind::EmbeddingSource,
            CacheError::Fallback { .. } => CacheErrorKind::Fallback,
            CacheError::Unavailable { .. } => CacheErrorKind::Unavailable,
            CacheError::Config { .. } => CacheErrorKind::Config,
        }
    }

    pub(crate) fn fallback(err: impl std::fmt::Display) -> Self {
        CacheError::Fallback {
            message: err.to_string(),
        }
    }
}

impl From<DimValidationError> for CacheError {
    fn from(err: DimValidationError) -> Self {
        match err {
            DimValidationError::DimensionMismatch { expected, actual } => {
                CacheError::DimensionMismatch { expected, actual }
            }
            DimValidationError::ZeroDimension => CacheError::Config {
                reason: err.to_string(),
            },
        }
    }
}

/// Convenience result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
