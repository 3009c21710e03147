use std::path::PathBuf;

use crate::arena::RegionLayout;
use crate::constants::{
    BYTES_PER_GB, DEFAULT_EMBEDDING_DIM, DEFAULT_HIGH_WATERMARK, DEFAULT_MAX_DOCUMENTS,
    DEFAULT_MEMORY_BUDGET_BYTES, DimConfig,
};

use super::error::{CacheError, CacheResult};

/// What to do when an insert needs room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionStrategy {
    /// Evict the least recently used document.
    #[default]
    Lru,
    /// Never evict; a full cache rejects inserts with [`CacheError::Capacity`].
    Disabled,
}

impl std::str::FromStr for EvictionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(EvictionStrategy::Lru),
            "disabled" | "none" | "off" => Ok(EvictionStrategy::Disabled),
            other => Err(format!("unknown eviction strategy '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RamCacheConfig {
    pub memory_budget_bytes: usize,
    pub eviction: EvictionStrategy,
    pub embedding_dim: usize,
    pub max_documents: usize,
    /// Carried for callers that snapshot the cache elsewhere; the engine itself never persists.
    pub persist_hint: Option<PathBuf>,
    /// Vector-region utilization above which inserts evict before allocating.
    pub high_watermark: f64,
}

impl Default for RamCacheConfig {
    fn default() -> Self {
        Self {
            memory_budget_bytes: DEFAULT_MEMORY_BUDGET_BYTES,
            eviction: EvictionStrategy::Lru,
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            max_documents: DEFAULT_MAX_DOCUMENTS,
            persist_hint: None,
            high_watermark: DEFAULT_HIGH_WATERMARK,
        }
    }
}

impl RamCacheConfig {
    pub fn new(memory_budget_bytes: usize, embedding_dim: usize, max_documents: usize) -> Self {
        Self {
            memory_budget_bytes,
            embedding_dim,
            max_documents,
            ..Default::default()
        }
    }

    pub fn memory_budget_gb(mut self, gb: f64) -> Self {
        self.memory_budget_bytes = (gb * BYTES_PER_GB) as usize;
        self
    }

    pub fn memory_budget_bytes(mut self, bytes: usize) -> Self {
        self.memory_budget_bytes = bytes;
        self
    }

    pub fn eviction(mut self, eviction: EvictionStrategy) -> Self {
        self.eviction = eviction;
        self
    }

    pub fn embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    pub fn max_documents(mut self, max: usize) -> Self {
        self.max_documents = max;
        self
    }

    pub fn persist_hint(mut self, path: impl Into<PathBuf>) -> Self {
        self.persist_hint = Some(path.into());
        self
    }

    pub fn high_watermark(mut self, watermark: f64) -> Self {
        self.high_watermark = watermark;
        self
    }

    /// Region placement this config produces.
    pub fn layout(&self) -> RegionLayout {
        RegionLayout::new(self.memory_budget_bytes, self.embedding_dim)
    }

    pub fn validate(&self) -> CacheResult<()> {
        DimConfig::new(self.embedding_dim).validate()?;
        if self.max_documents == 0 {
            return Err(CacheError::Config {
                reason: "max_documents must be > 0".to_string(),
            });
        }
        if !(self.high_watermark > 0.0 && self.high_watermark <= 1.0) {
            return Err(CacheError::Config {
                reason: format!(
                    "high_watermark ({}) must be in (0, 1]",
                    self.high_watermark
                ),
            });
        }
        if self.layout().slot_capacity() == 0 {
            return Err(CacheError::Config {
                reason: format!(
                    "memory budget of {} bytes cannot hold a single {}-dimensional embedding",
                    self.memory_budget_bytes, self.embedding_dim
                ),
            });
        }
        Ok(())
    }
}
