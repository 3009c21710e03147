//! Embedding sources and the embedding-result memo.
//!
//! - [`Embedder`] is the seam the cached store embeds text through.
//! - [`StubEmbedder`] produces deterministic unit vectors without a model.
//! - [`HttpEmbedder`] calls an OpenAI-compatible `/embeddings` endpoint.
//! - [`EmbeddingMemo`] remembers results by exact text.

mod error;
/// OpenAI-compatible HTTP embedder.
pub mod http;
/// Exact-text embedding memo.
pub mod memo;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod stub;


pub use error::EmbeddingError;
pub use http::{HttpEmbedder, HttpEmbedderConfig};
pub use memo::{EmbeddingMemo, MemoStats};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockEmbedder;
pub use stub::StubEmbedder;

use async_trait::async_trait;

/// Turns text into a fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds one piece of text. The result has [`dimension`](Self::dimension) elements.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Length of every vector this embedder returns.
    fn dimension(&self) -> usize;

    /// Short label for logs.
    fn name(&self) -> &str {
        "embedder"
    }
}
