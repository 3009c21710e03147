use serde::{Deserialize, Serialize};

/// Opaque key-value bag attached by the caller and returned unchanged with search results.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A text chunk handed to the cache for indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl DocumentChunk {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: Metadata::new(),
        }
    }

    /// Chunk with a random v4 UUID id.
    pub fn generated(text: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), text)
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Bookkeeping for one live cache entry. The embedding itself stays in the arena slot at
/// `memory_offset`.
#[derive(Debug, Clone)]
pub struct CachedDocument {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    pub access_count: u64,
    pub last_accessed_ms: i64,
    pub memory_offset: usize,
}

/// Copy of a cached document and its embedding, for inspection.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    pub embedding: Vec<f32>,
    pub access_count: u64,
    pub last_accessed_ms: i64,
    pub memory_offset: usize,
}

/// One search result. `score` is a cosine distance: lower is more relevant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CacheStats {
    pub document_count: usize,
    pub bytes_used: usize,
    pub searches: u64,
    pub hits: u64,
    pub hit_rate: f64,
    pub avg_search_time_us: f64,
    pub last_search_time_us: u64,
    pub evictions: u64,
    pub insertions: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MemoryUsage {
    pub budget_bytes: usize,
    pub vector_region_bytes: usize,
    pub metadata_region_bytes: usize,
    pub index_region_bytes: usize,
    pub lru_region_bytes: usize,
    pub slot_bytes: usize,
    pub slot_capacity: usize,
    pub live_slots: usize,
    pub vector_bytes_used: usize,
    /// Heap bytes held by document text and serialized metadata (outside the arena).
    pub document_heap_bytes: usize,
    /// `vector_bytes_used / vector_region_bytes`.
    pub utilization: f64,
}
