//! Budgeted in-RAM vector cache.
//!
//! [`RamVectorCache`] ties the [`arena`](crate::arena), the [`lru`](crate::lru) tracker and the
//! [`similarity`](crate::similarity) engine together behind a single lock.

mod config;
mod error;
mod ram;
mod stats;
mod types;


pub use config::{EvictionStrategy, RamCacheConfig};
pub use error::{CacheError, CacheErrorKind, CacheResult};
pub use ram::RamVectorCache;
pub use types::{
    CacheStats, CachedDocument, DocumentChunk, DocumentSnapshot, MemoryUsage, Metadata, SearchHit,
};
