//! Persistent vector stores.
//!
//! [`VectorStore`] is the async contract every store satisfies. [`QdrantStore`] is the
//! production fallback; [`MockVectorStore`] is an in-memory stand-in for tests.

pub mod client;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod model;


pub use client::{QdrantStore, VectorStore};
pub use error::{StoreOp, VectorDbError};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockVectorStore;
pub use model::{chunk_to_point, hit_from_scored_point, similarity_to_distance};

pub const DEFAULT_COLLECTION_NAME: &str = "stratum_chunks";

pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

/// Whether Qdrant writes block until the points are searchable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteConsistency {
    /// `wait=true`: a fallback search right after an add sees the new points.
    #[default]
    Strong,
    /// `wait=false`: the write returns once Qdrant has queued it.
    Eventual,
}

impl From<WriteConsistency> for bool {
    fn from(consistency: WriteConsistency) -> bool {
        consistency == WriteConsistency::Strong
    }
}
