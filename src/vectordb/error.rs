use std::fmt;

use thiserror::Error;

/// Collection-level operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    CreateCollection,
    DropCollection,
    Upsert,
    Search,
    Delete,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StoreOp::CreateCollection => "create collection",
            StoreOp::DropCollection => "drop collection",
            StoreOp::Upsert => "upsert",
            StoreOp::Search => "search",
            StoreOp::Delete => "delete",
        })
    }
}

#[derive(Debug, Error)]
/// Errors returned by persistent vector store operations.
pub enum VectorDbError {
    /// The endpoint could not be reached or refused the request.
    #[error("cannot reach vector store at '{url}': {message}")]
    ConnectionFailed { url: String, message: String },

    /// A collection operation was rejected.
    #[error("{op} on '{collection}' failed: {message}")]
    OperationFailed {
        op: StoreOp,
        collection: String,
        message: String,
    },

    #[error("invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("batch length mismatch: {chunks} chunks, {embeddings} embeddings")]
    LengthMismatch { chunks: usize, embeddings: usize },

    /// A stored point could not be turned back into a document.
    #[error("malformed payload for point {point_id}: {message}")]
    InvalidPayload { point_id: u64, message: String },

    /// The store refused the operation (e.g. injected failure in tests).
    #[error("vector store unavailable: {message}")]
    Unavailable { message: String },
}

impl VectorDbError {
    pub(crate) fn operation(
        op: StoreOp,
        collection: impl Into<String>,
        err: impl fmt::Display,
    ) -> Self {
        VectorDbError::OperationFailed {
            op,
            collection: collection.into(),
            message: err.to_string(),
        }
    }

    /// Operation that failed, for [`OperationFailed`](Self::OperationFailed) errors.
    pub fn op(&self) -> Option<StoreOp> {
        match self {
            VectorDbError::OperationFailed { op, .. } => Some(*op),
            _ => None,
        }
    }
}
