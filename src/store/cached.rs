use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::future::try_join_all;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::cache::{
    CacheError, CacheResult, CacheStats, DocumentChunk, MemoryUsage, RamCacheConfig,
    RamVectorCache, SearchHit,
};
use crate::embedding::{Embedder, EmbeddingMemo, MemoStats};
use crate::vectordb::VectorStore;

use super::config::{MirrorMode, StoreConfig};
use super::tasks::BackgroundTasks;

/// Query accepted by [`CachedVectorStore::search`].
#[derive(Debug, Clone, PartialEq)]
pub enum SearchQuery {
    /// Embedded through the memo and embedding source first.
    Text(String),
    /// Used as is.
    Vector(Vec<f32>),
}

impl From<&str> for SearchQuery {
    fn from(text: &str) -> Self {
        SearchQuery::Text(text.to_string())
    }
}

impl From<String> for SearchQuery {
    fn from(text: String) -> Self {
        SearchQuery::Text(text)
    }
}

impl From<Vec<f32>> for SearchQuery {
    fn from(vector: Vec<f32>) -> Self {
        SearchQuery::Vector(vector)
    }
}

impl From<&[f32]> for SearchQuery {
    fn from(vector: &[f32]) -> Self {
        SearchQuery::Vector(vector.to_vec())
    }
}

#[derive(Debug, Default)]
struct FallbackCounters {
    adds: AtomicU64,
    searches: AtomicU64,
    failures: AtomicU64,
    mirror_writes: AtomicU64,
    mirror_failures: AtomicU64,
}

impl FallbackCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct StoreStats {
    /// RAM cache counters; zeroed when the RAM cache is disabled.
    pub cache: CacheStats,
    pub memo: MemoStats,
    /// Batches written to the fallback because RAM rejected them (or RAM is disabled).
    pub fallback_adds: u64,
    /// Searches answered by the fallback.
    pub fallback_searches: u64,
    /// Fallback calls that failed on a degraded path.
    pub fallback_failures: u64,
    pub mirror_writes: u64,
    pub mirror_failures: u64,
    pub background_tasks: usize,
    pub ram_cache_enabled: bool,
    pub fallback_active: bool,
}

/// RAM cache in front of a persistent store, with an embedding memo.
///
/// Reads and writes go to the RAM cache. When it fails and a fallback is configured, the same
/// request is retried against the fallback; if that fails too the RAM error is returned.
pub struct CachedVectorStore<F, E: ?Sized> {
    ram: Option<Arc<RamVectorCache>>,
    memo: Arc<EmbeddingMemo>,
    embedder: Arc<E>,
    fallback: Option<Arc<F>>,
    config: StoreConfig,
    counters: Arc<FallbackCounters>,
    tasks: BackgroundTasks,
}

impl<F, E: ?Sized> std::fmt::Debug for CachedVectorStore<F, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedVectorStore")
            .field("ram", &self.ram)
            .field("has_fallback", &self.fallback.is_some())
            .field("config", &self.config)
            .field("tasks", &self.tasks)
            .finish_non_exhaustive()
    }
}

impl<F, E> CachedVectorStore<F, E>
where
    F: VectorStore + 'static,
    E: Embedder + ?Sized + 'static,
{
    /// Builds the store and, when enabled and a runtime is available, spawns warmup.
    pub fn new(
        config: StoreConfig,
        ram_config: RamCacheConfig,
        embedder: Arc<E>,
        fallback: Option<F>,
    ) -> CacheResult<Self> {
        config.validate()?;

        if embedder.dimension() != ram_config.embedding_dim {
            return Err(CacheError::Config {
                reason: format!(
                    "embedder '{}' produces {} dimensions, cache expects {}",
                    embedder.name(),
                    embedder.dimension(),
                    ram_config.embedding_dim
                ),
            });
        }
        if !config.ram_cache_enabled && fallback.is_none() {
            return Err(CacheError::Config {
                reason: "RAM cache disabled and no fallback store supplied".to_string(),
            });
        }
        if config.fallback_enabled && fallback.is_none() {
            warn!("Fallback enabled but no fallback store supplied; running RAM only");
        }

        let ram = if config.ram_cache_enabled {
            Some(Arc::new(RamVectorCache::new(ram_config)?))
        } else {
            None
        };

        let store = Self {
            ram,
            memo: Arc::new(EmbeddingMemo::new()),
            embedder,
            fallback: fallback.map(Arc::new),
            config,
            counters: Arc::new(FallbackCounters::default()),
            tasks: BackgroundTasks::new(),
        };
        store.start_warmup();
        Ok(store)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The RAM cache, if enabled.
    pub fn ram_cache(&self) -> Option<&RamVectorCache> {
        self.ram.as_deref()
    }

    pub fn memo(&self) -> &EmbeddingMemo {
        &self.memo
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    pub fn fallback(&self) -> Option<&F> {
        self.fallback.as_deref()
    }

    /// Embeds each chunk's text (memo first) and inserts the batch.
    #[instrument(skip_all, fields(batch = chunks.len()))]
    pub async fn add_documents(&self, chunks: &[DocumentChunk]) -> CacheResult<()> {
        let embeddings = try_join_all(chunks.iter().map(|c| self.embed_text(&c.text))).await?;
        self.add_documents_with_embeddings(chunks, &embeddings).await
    }

    /// Inserts a batch with caller-supplied embeddings.
    #[instrument(skip_all, fields(batch = chunks.len()))]
    pub async fn add_documents_with_embeddings(
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

        let Some(ram) = &self.ram else {
            return self.add_to_fallback_only(chunks, embeddings).await;
        };

        match ram.add_documents(chunks, embeddings) {
            Ok(()) => {
                debug!("Batch cached in RAM");
                self.mirror(chunks, embeddings).await
            }
            Err(ram_err) => {
                let Some(fallback) = self.active_fallback() else {
                    return Err(ram_err);
                };
                warn!(error = %ram_err, "RAM cache rejected batch, writing to fallback store");
                match fallback.add(chunks, embeddings).await {
                    Ok(()) => {
                        FallbackCounters::bump(&self.counters.adds);
                        info!(batch = chunks.len(), "Batch stored in fallback store");
                        Ok(())
                    }
                    Err(fallback_err) => {
                        FallbackCounters::bump(&self.counters.failures);
                        warn!(error = %fallback_err, "Fallback store rejected batch too");
                        Err(ram_err)
                    }
                }
            }
        }
    }

    /// Top-`k` search. Text queries go through the memo and embedding source.
    #[instrument(skip_all, fields(k = k))]
    pub async fn search(
        &self,
        query: impl Into<SearchQuery>,
        k: usize,
    ) -> CacheResult<Vec<SearchHit>> {
        let vector = match query.into() {
            SearchQuery::Text(text) => self.embed_text(&text).await?,
            SearchQuery::Vector(vector) => vector,
        };

        let Some(ram) = &self.ram else {
            return self.search_fallback_only(&vector, k).await;
        };

        match ram.search(&vector, k) {
            Ok(hits) => Ok(hits),
            Err(ram_err) => {
                let Some(fallback) = self.active_fallback() else {
                    return Err(ram_err);
                };
                warn!(error = %ram_err, "RAM cache search failed, querying fallback store");
                match fallback.search(&vector, k).await {
                    Ok(hits) => {
                        FallbackCounters::bump(&self.counters.searches);
                        Ok(hits)
                    }
                    Err(fallback_err) => {
                        FallbackCounters::bump(&self.counters.failures);
                        warn!(error = %fallback_err, "Fallback store search failed too");
                        Err(ram_err)
                    }
                }
            }
        }
    }

    /// Trims the embedding memo. Returns the number of entries dropped.
    pub fn optimize(&self) -> usize {
        let removed = self
            .memo
            .trim(self.config.memo_trim_threshold, self.config.memo_retain);
        if removed > 0 {
            info!(removed, remaining = self.memo.len(), "Embedding memo trimmed");
        }
        removed
    }

    /// Waits for mirror writes and warmup to finish. Returns how many tasks finished since the
    /// previous wait. Dropping the returned future leaves the tasks running.
    pub async fn wait_for_background_tasks(&self) -> usize {
        self.tasks.wait_all().await
    }

    /// Empties the RAM cache and the memo. The fallback store is left alone unless it is the
    /// only store.
    pub async fn clear(&self) -> CacheResult<()> {
        self.memo.clear();
        match (&self.ram, &self.fallback) {
            (Some(ram), _) => ram.clear(),
            (None, Some(fallback)) => fallback.clear().await.map_err(CacheError::fallback),
            (None, None) => Ok(()),
        }
    }

    pub fn get_stats(&self) -> StoreStats {
        StoreStats {
            cache: self
                .ram
                .as_ref()
                .map(|ram| ram.get_stats())
                .unwrap_or_default(),
            memo: self.memo.stats(),
            fallback_adds: self.counters.adds.load(Ordering::Relaxed),
            fallback_searches: self.counters.searches.load(Ordering::Relaxed),
            fallback_failures: self.counters.failures.load(Ordering::Relaxed),
            mirror_writes: self.counters.mirror_writes.load(Ordering::Relaxed),
            mirror_failures: self.counters.mirror_failures.load(Ordering::Relaxed),
            background_tasks: self.tasks.len(),
            ram_cache_enabled: self.ram.is_some(),
            fallback_active: self.active_fallback().is_some(),
        }
    }

    /// RAM cache memory breakdown; `None` when the RAM cache is disabled.
    pub fn get_memory_usage(&self) -> Option<MemoryUsage> {
        self.ram.as_ref().map(|ram| ram.get_memory_usage())
    }

    async fn embed_text(&self, text: &str) -> CacheResult<Vec<f32>> {
        if let Some(embedding) = self.memo.get(text) {
            return Ok(embedding);
        }
        let embedding = self.embedder.embed(text).await?;
        self.memo.insert(text, embedding.clone());
        Ok(embedding)
    }

    fn active_fallback(&self) -> Option<&Arc<F>> {
        if self.config.fallback_enabled {
            self.fallback.as_ref()
        } else {
            None
        }
    }

    async fn add_to_fallback_only(
        &self,
        chunks: &[DocumentChunk],
        embeddings: &[Vec<f32>],
    ) -> CacheResult<()> {
        let Some(fallback) = &self.fallback else {
            return Ok(());
        };
        fallback
            .add(chunks, embeddings)
            .await
            .map_err(CacheError::fallback)?;
        FallbackCounters::bump(&self.counters.adds);
        Ok(())
    }

    async fn search_fallback_only(&self, query: &[f32], k: usize) -> CacheResult<Vec<SearchHit>> {
        let Some(fallback) = &self.fallback else {
            return Ok(Vec::new());
        };
        let hits = fallback
            .search(query, k)
            .await
            .map_err(CacheError::fallback)?;
        FallbackCounters::bump(&self.counters.searches);
        Ok(hits)
    }

    async fn mirror(&self, chunks: &[DocumentChunk], embeddings: &[Vec<f32>]) -> CacheResult<()> {
        let Some(fallback) = self.active_fallback() else {
            return Ok(());
        };

        match self.config.mirror_mode {
            MirrorMode::Disabled => Ok(()),
            MirrorMode::Synchronous => match fallback.add(chunks, embeddings).await {
                Ok(()) => {
                    FallbackCounters::bump(&self.counters.mirror_writes);
                    Ok(())
                }
                Err(e) => {
                    FallbackCounters::bump(&self.counters.mirror_failures);
                    Err(CacheError::fallback(e))
                }
            },
            MirrorMode::Background => {
                let fallback = Arc::clone(fallback);
                let counters = Arc::clone(&self.counters);
                let chunks = chunks.to_vec();
                let embeddings = embeddings.to_vec();
                self.tasks.spawn(async move {
                    match fallback.add(&chunks, &embeddings).await {
                        Ok(()) => FallbackCounters::bump(&counters.mirror_writes),
                        Err(e) => {
                            FallbackCounters::bump(&counters.mirror_failures);
                            warn!(error = %e, batch = chunks.len(), "Background mirror write failed");
                        }
                    }
                });
                Ok(())
            }
        }
    }

    fn start_warmup(&self) {
        if !self.config.warmup_enabled || self.config.warmup_queries.is_empty() {
            return;
        }
        if tokio::runtime::Handle::try_current().is_err() {
            debug!("No tokio runtime; skipping embedding warmup");
            return;
        }

        let memo = Arc::clone(&self.memo);
        let embedder = Arc::clone(&self.embedder);
        let queries = self.config.warmup_queries.clone();
        self.tasks.spawn(async move {
            let mut primed = 0usize;
            for query in &queries {
                if memo.contains(query) {
                    continue;
                }
                match embedder.embed(query).await {
                    Ok(embedding) => {
                        memo.insert(query, embedding);
                        primed += 1;
                    }
                    Err(e) => warn!(error = %e, "Warmup embedding failed"),
                }
            }
            debug!(primed, total = queries.len(), "Embedding warmup finished");
        });
    }
}

impl<F, E> VectorStore for CachedVectorStore<F, E>
where
    F: VectorStore + 'static,
    E: Embedder + ?Sized + 'static,
{
    type Error = CacheError;

    async fn add(&self, chunks: &[DocumentChunk], embeddings: &[Vec<f32>]) -> CacheResult<()> {
        self.add_documents_with_embeddings(chunks, embeddings).await
    }

    async fn search(&self, query: &[f32], k: usize) -> CacheResult<Vec<SearchHit>> {
        CachedVectorStore::search(self, query, k).await
    }

    async fn clear(&self) -> CacheResult<()> {
        CachedVectorStore::clear(self).await
    }
}
