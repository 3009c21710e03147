use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use parking_lot::Mutex as StatsLock;
use tracing::{debug, instrument, trace, warn};

use crate::arena::{MemoryArena, Region, SlotIndex};
use crate::constants::validate_embedding_dim;
use crate::lru::LruTracker;
use crate::similarity::{SimilarityEngine, norm};
use crate::vectordb::VectorStore;

use super::config::{EvictionStrategy, RamCacheConfig};
use super::error::{CacheError, CacheResult};
use super::stats::StatsTracker;
use super::types::{
    CacheStats, CachedDocument, DocumentChunk, DocumentSnapshot, MemoryUsage, Metadata, SearchHit,
};

struct SlotEntry {
    document: CachedDocument,
    /// L2 norm of the slot's embedding, computed once at write time.
    norm: f32,
    heap_bytes: usize,
}

struct CacheState {
    arena: MemoryArena,
    lru: LruTracker,
    entries: Vec<Option<SlotEntry>>,
    index: HashMap<String, SlotIndex>,
}

impl CacheState {
    fn entry(&self, slot: SlotIndex) -> &SlotEntry {
        self.entries[slot as usize]
            .as_ref()
            .unwrap_or_else(|| panic!("live slot {slot} has no document"))
    }

    fn entry_mut(&mut self, slot: SlotIndex) -> &mut SlotEntry {
        self.entries[slot as usize]
            .as_mut()
            .unwrap_or_else(|| panic!("live slot {slot} has no document"))
    }
}

/// In-process vector cache over a fixed memory budget.
///
/// Embeddings live in a pre-allocated [`MemoryArena`]; documents, the id index and the LRU list
/// reference them by slot. All state sits behind one lock, so every public operation is atomic
/// with respect to the others. A panic while the lock is held leaves the cache
/// [`Unavailable`](CacheError::Unavailable) instead of half-mutated.
pub struct RamVectorCache {
    state: Mutex<CacheState>,
    stats: StatsLock<StatsTracker>,
    engine: SimilarityEngine,
    config: RamCacheConfig,
    slot_capacity: usize,
}

impl std::fmt::Debug for RamVectorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RamVectorCache")
            .field("config", &self.config)
            .field("slot_capacity", &self.slot_capacity)
            .field("stats", &*self.stats.lock())
            .finish_non_exhaustive()
    }
}

impl RamVectorCache {
    /// Validates `config` and pre-allocates the whole memory budget.
    pub fn new(config: RamCacheConfig) -> CacheResult<Self> {
        config.validate()?;

        let arena = MemoryArena::with_slot_limit(config.layout(), config.max_documents);
        let slot_capacity = arena.slot_capacity();
        let mut entries = Vec::with_capacity(slot_capacity);
        entries.resize_with(slot_capacity, || None);

        debug!(
            budget_bytes = config.memory_budget_bytes,
            embedding_dim = config.embedding_dim,
            slot_capacity,
            eviction = ?config.eviction,
            "RAM vector cache allocated"
        );

        Ok(Self {
            state: Mutex::new(CacheState {
                arena,
                lru: LruTracker::new(slot_capacity),
                entries,
                index: HashMap::new(),
            }),
            stats: StatsLock::new(StatsTracker::default()),
            engine: SimilarityEngine::new(),
            config,
            slot_capacity,
        })
    }

    #[inline]
    pub fn config(&self) -> &RamCacheConfig {
        &self.config
    }

    #[inline]
    pub fn embedding_dim(&self) -> usize {
        self.config.embedding_dim
    }

    /// `false` once a panic has poisoned the internal state.
    pub fn is_healthy(&self) -> bool {
        !self.state.is_poisoned()
    }

    pub fn len(&self) -> usize {
        self.stats.lock().snapshot().document_count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts or replaces documents. Ids already present are updated in place and promoted.
    ///
    /// The whole batch is validated before any state changes. A capacity failure part-way through
    /// leaves the documents before it inserted.
    #[instrument(skip_all, fields(batch = chunks.len()))]
    pub fn add_documents(
        &self,
        chunks: &[DocumentChunk],
        embeddings: &[Vec<f32>],
    ) -> CacheResult<()> {
        if chunks.len() != embeddings.len() {
            return Err(CacheError::LengthMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }
        for embedding in embeddings {
            self.check_dim(embedding)?;
        }
        if chunks.is_empty() {
            return Ok(());
        }

        let mut guard = self.lock_state()?;
        let state = &mut *guard;

        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            match state.index.get(&chunk.id).copied() {
                Some(slot) => self.update_in_place(state, slot, chunk, embedding),
                None => self.insert_new(state, chunk, embedding)?,
            }
        }

        trace!(documents = state.index.len(), "Batch cached");
        Ok(())
    }

    /// Brute-force cosine search over every cached embedding.
    ///
    /// Returns at most `k` hits ordered by ascending distance. Returned documents are promoted
    /// in the LRU list and their access counters bumped.
    #[instrument(skip_all, fields(k = k))]
    pub fn search(&self, query: &[f32], k: usize) -> CacheResult<Vec<SearchHit>> {
        let started = Instant::now();
        let result = self.search_locked(query, k);
        let found = matches!(&result, Ok(hits) if !hits.is_empty());
        self.stats.lock().record_search(started.elapsed(), found);
        result
    }

    fn search_locked(&self, query: &[f32], k: usize) -> CacheResult<Vec<SearchHit>> {
        self.check_dim(query)?;

        let mut guard = self.lock_state()?;
        let state = &mut *guard;
        if k == 0 || state.index.is_empty() {
            return Ok(Vec::new());
        }

        let top = {
            let arena = &state.arena;
            let entries = &state.entries;
            let candidates = arena.occupied_slots().map(|slot| {
                let norm = entries[slot as usize].as_ref().map_or(0.0, |e| e.norm);
                (slot, arena.slot(slot), norm)
            });
            self.engine.top_k(query, candidates, k)
        };

        let now = now_ms();
        let hits = top
            .into_iter()
            .map(|scored| {
                state.lru.touch(scored.slot);
                let entry = state.entry_mut(scored.slot);
                entry.document.access_count += 1;
                entry.document.last_accessed_ms = now;
                SearchHit {
                    id: entry.document.id.clone(),
                    text: entry.document.text.clone(),
                    metadata: entry.document.metadata.clone(),
                    score: scored.distance,
                }
            })
            .collect::<Vec<_>>();

        trace!(hits = hits.len(), "Search complete");
        Ok(hits)
    }

    /// Drops one document. Returns whether it was present.
    pub fn remove(&self, id: &str) -> CacheResult<bool> {
        let mut guard = self.lock_state()?;
        let state = &mut *guard;
        let Some(slot) = state.index.get(id).copied() else {
            return Ok(false);
        };
        state.lru.remove(slot);
        self.release_slot(state, slot, false);
        Ok(true)
    }

    /// Removes every document, zeroes the arena and resets statistics.
    pub fn clear(&self) -> CacheResult<()> {
        let mut guard = self.lock_state()?;
        let state = &mut *guard;
        state.arena.reset();
        state.lru.clear();
        state.entries.iter_mut().for_each(|e| *e = None);
        state.index.clear();
        self.stats.lock().reset();
        debug!("RAM vector cache cleared");
        Ok(())
    }

    pub fn contains(&self, id: &str) -> CacheResult<bool> {
        Ok(self.lock_state()?.index.contains_key(id))
    }

    /// Copy of a cached document and its embedding. Does not count as an access.
    pub fn get_document(&self, id: &str) -> CacheResult<Option<DocumentSnapshot>> {
        let guard = self.lock_state()?;
        let Some(&slot) = guard.index.get(id) else {
            return Ok(None);
        };
        let document = &guard.entry(slot).document;
        Ok(Some(DocumentSnapshot {
            id: document.id.clone(),
            text: document.text.clone(),
            metadata: document.metadata.clone(),
            embedding: guard.arena.slot(slot).to_vec(),
            access_count: document.access_count,
            last_accessed_ms: document.last_accessed_ms,
            memory_offset: document.memory_offset,
        }))
    }

    /// `(id, byte offset)` of every live document, in slot order.
    pub fn document_offsets(&self) -> CacheResult<Vec<(String, usize)>> {
        let guard = self.lock_state()?;
        Ok(guard
            .arena
            .occupied_slots()
            .map(|slot| {
                let document = &guard.entry(slot).document;
                (document.id.clone(), document.memory_offset)
            })
            .collect())
    }

    /// Ids from most to least recently used.
    pub fn recency_order(&self) -> CacheResult<Vec<String>> {
        let guard = self.lock_state()?;
        Ok(guard
            .lru
            .iter_mru()
            .map(|slot| guard.entry(slot).document.id.clone())
            .collect())
    }

    /// Counters snapshot. Never blocks on the state lock.
    pub fn get_stats(&self) -> CacheStats {
        self.stats.lock().snapshot()
    }

    /// Region sizes and occupancy. Never blocks on the state lock.
    pub fn get_memory_usage(&self) -> MemoryUsage {
        let layout = self.config.layout();
        let stats = self.stats.lock();
        let snapshot = stats.snapshot();
        let vector_region_bytes = layout.span(Region::Vectors).len;
        let utilization = if vector_region_bytes > 0 {
            snapshot.bytes_used as f64 / vector_region_bytes as f64
        } else {
            0.0
        };

        MemoryUsage {
            budget_bytes: layout.budget_bytes(),
            vector_region_bytes,
            metadata_region_bytes: layout.span(Region::Metadata).len,
            index_region_bytes: layout.span(Region::Index).len,
            lru_region_bytes: layout.span(Region::Lru).len,
            slot_bytes: layout.slot_bytes(),
            slot_capacity: self.slot_capacity,
            live_slots: snapshot.document_count,
            vector_bytes_used: snapshot.bytes_used,
            document_heap_bytes: stats.document_heap_bytes(),
            utilization,
        }
    }

    fn check_dim(&self, embedding: &[f32]) -> CacheResult<()> {
        Ok(validate_embedding_dim(embedding.len(), self.config.embedding_dim)?)
    }

    fn lock_state(&self) -> CacheResult<MutexGuard<'_, CacheState>> {
        self.state.lock().map_err(|_| CacheError::Unavailable {
            reason: "state lock poisoned by a panic during a previous operation".to_string(),
        })
    }

    fn update_in_place(
        &self,
        state: &mut CacheState,
        slot: SlotIndex,
        chunk: &DocumentChunk,
        embedding: &[f32],
    ) {
        state.arena.write_slot(slot, embedding);
        let heap_bytes = heap_bytes(chunk);
        let entry = state.entry_mut(slot);
        let old_heap_bytes = entry.heap_bytes;
        entry.document.text.clone_from(&chunk.text);
        entry.document.metadata.clone_from(&chunk.metadata);
        entry.norm = norm(embedding);
        entry.heap_bytes = heap_bytes;
        state.lru.touch(slot);
        self.stats.lock().record_update(old_heap_bytes, heap_bytes);
        trace!(id = %chunk.id, slot, "Document updated in place");
    }

    fn insert_new(
        &self,
        state: &mut CacheState,
        chunk: &DocumentChunk,
        embedding: &[f32],
    ) -> CacheResult<()> {
        self.make_room(state)?;

        let slot = loop {
            if let Some(slot) = state.arena.allocate() {
                break slot;
            }
            if !self.evict_one(state) {
                return Err(self.capacity_error(state));
            }
        };

        state.arena.write_slot(slot, embedding);
        let heap_bytes = heap_bytes(chunk);
        state.entries[slot as usize] = Some(SlotEntry {
            document: CachedDocument {
                id: chunk.id.clone(),
                text: chunk.text.clone(),
                metadata: chunk.metadata.clone(),
                access_count: 0,
                last_accessed_ms: now_ms(),
                memory_offset: state.arena.byte_offset(slot),
            },
            norm: norm(embedding),
            heap_bytes,
        });
        state.index.insert(chunk.id.clone(), slot);
        state.lru.insert(slot);
        self.stats
            .lock()
            .record_insert(state.arena.slot_bytes(), heap_bytes);
        Ok(())
    }

    /// Evicts until one more document fits under the document ceiling and the watermark.
    ///
    /// The document ceiling is hard. The watermark is advisory: with eviction disabled the
    /// insert still proceeds while free slots remain.
    fn make_room(&self, state: &mut CacheState) -> CacheResult<()> {
        let vector_region = state.arena.layout().span(Region::Vectors).len as f64;
        loop {
            let at_ceiling = state.index.len() >= self.config.max_documents;
            let used = (state.arena.live_slots() * state.arena.slot_bytes()) as f64;
            let over_watermark = used / vector_region > self.config.high_watermark;

            if !at_ceiling && !over_watermark {
                return Ok(());
            }
            if !self.evict_one(state) {
                if at_ceiling {
                    return Err(self.capacity_error(state));
                }
                return Ok(());
            }
        }
    }

    fn evict_one(&self, state: &mut CacheState) -> bool {
        if self.config.eviction == EvictionStrategy::Disabled {
            return false;
        }
        let Some(slot) = state.lru.evict_victim() else {
            return false;
        };
        self.release_slot(state, slot, true);
        true
    }

    /// Frees an already unlinked slot and forgets its document.
    fn release_slot(&self, state: &mut CacheState, slot: SlotIndex, evicted: bool) {
        let Some(entry) = state.entries[slot as usize].take() else {
            warn!(slot, "Released slot had no document");
            return;
        };
        state.index.remove(&entry.document.id);
        state.arena.deallocate(slot);
        self.stats
            .lock()
            .record_removal(state.arena.slot_bytes(), entry.heap_bytes, evicted);
        if evicted {
            debug!(id = %entry.document.id, slot, "Evicted least recently used document");
        }
    }

    fn capacity_error(&self, state: &CacheState) -> CacheError {
        CacheError::Capacity {
            live_documents: state.index.len(),
            slot_capacity: self.slot_capacity,
            max_documents: self.config.max_documents,
        }
    }

    /// Poisons the state lock so that every later call fails with
    /// [`CacheError::Unavailable`].
    #[cfg(any(test, feature = "mock"))]
    pub fn poison(&self) {
        std::thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = self.state.lock();
                    panic!("Intentional panic to poison cache state for testing");
                })
                .join();
        });
    }
}

fn heap_bytes(chunk: &DocumentChunk) -> usize {
    chunk.id.len() + chunk.text.len() + metadata_bytes(&chunk.metadata)
}

fn metadata_bytes(metadata: &Metadata) -> usize {
    serde_json::to_vec(metadata).map_or(0, |bytes| bytes.len())
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl VectorStore for RamVectorCache {
    type Error = CacheError;

    async fn add(&self, chunks: &[DocumentChunk], embeddings: &[Vec<f32>]) -> CacheResult<()> {
        self.add_documents(chunks, embeddings)
    }

    async fn search(&self, query: &[f32], k: usize) -> CacheResult<Vec<SearchHit>> {
        RamVectorCache::search(self, query, k)
    }

    async fn clear(&self) -> CacheResult<()> {
        RamVectorCache::clear(self)
    }
}
