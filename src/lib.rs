//! Stratum library crate (used by the CLI binary and integration tests).
//!
//! # Public API Surface
//!
//! ## Core Types
//! - [`RamVectorCache`], [`RamCacheConfig`] - Arena-backed in-memory vector cache
//! - [`CachedVectorStore`], [`StoreConfig`] - RAM cache with persistent fallback and mirroring
//! - [`Config`], [`ConfigError`] - Environment-backed process configuration
//!
//! ## Building Blocks
//! - [`MemoryArena`], [`RegionLayout`] - Fixed-budget region arena and slot allocator
//! - [`LruTracker`] - Index-based recency list
//! - [`SimilarityEngine`] - Cosine distance and stable top-k selection
//!
//! ## Embedding & Vector Database
//! - [`Embedder`], [`HttpEmbedder`], [`StubEmbedder`], [`EmbeddingMemo`]
//! - [`VectorStore`], [`QdrantStore`]
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod arena;
pub mod cache;
pub mod config;
pub mod constants;
pub mod embedding;
pub mod hashing;
pub mod lru;
pub mod similarity;
pub mod store;
pub mod vectordb;

pub use arena::{MemoryArena, Region, RegionLayout, RegionSpan, SlotAllocator, SlotIndex};
pub use cache::{
    CacheError, CacheErrorKind, CacheResult, CacheStats, CachedDocument, DocumentChunk,
    DocumentSnapshot, EvictionStrategy, MemoryUsage, Metadata, RamCacheConfig, RamVectorCache,
    SearchHit,
};
pub use config::{Config, ConfigError};
pub use constants::{DimConfig, DimValidationError, validate_embedding_dim};
#[cfg(any(test, feature = "mock"))]
pub use embedding::MockEmbedder;
pub use embedding::{
    Embedder, EmbeddingError, EmbeddingMemo, HttpEmbedder, HttpEmbedderConfig, MemoStats,
    StubEmbedder,
};
pub use hashing::{hash_text, hash_to_u64, point_id_for};
pub use lru::LruTracker;
pub use similarity::{ScoredSlot, SimilarityEngine, cosine_distance, cosine_similarity};
pub use store::{
    BackgroundTasks, CachedVectorStore, DEFAULT_WARMUP_QUERIES, MirrorMode, SearchQuery,
    StoreConfig, StoreStats,
};
#[cfg(any(test, feature = "mock"))]
pub use vectordb::MockVectorStore;
pub use vectordb::{
    DEFAULT_COLLECTION_NAME, DEFAULT_QDRANT_URL, QdrantStore, VectorDbError, VectorStore,
    WriteConsistency,
};
