//! Cached vector store facade.
//!
//! [`CachedVectorStore`] puts the [`RamVectorCache`](crate::cache::RamVectorCache) in front of a
//! persistent [`VectorStore`](crate::vectordb::VectorStore), memoizes embeddings by exact text,
//! and degrades to the persistent store when the RAM cache fails.

mod cached;
mod config;
mod tasks;

#[cfg(test)]
mod tests;

pub use cached::{CachedVectorStore, SearchQuery, StoreStats};
pub use config::{DEFAULT_WARMUP_QUERIES, MirrorMode, StoreConfig};
pub use tasks::BackgroundTasks;
