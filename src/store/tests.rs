use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::cache::{CacheError, CacheErrorKind, DocumentChunk, EvictionStrategy, RamCacheConfig};
use crate::embedding::MockEmbedder;
use crate::vectordb::{MockVectorStore, VectorStore};

const DIM: usize = 4;

type TestStore = CachedVectorStore<MockVectorStore, MockEmbedder>;

fn ram_config(max_documents: usize) -> RamCacheConfig {
    RamCacheConfig::new(1_000_000, DIM, max_documents)
}

fn embedder() -> Arc<MockEmbedder> {
    Arc::new(
        MockEmbedder::new(DIM)
            .with_pinned("a", vec![1.0, 0.0, 0.0, 0.0])
            .with_pinned("b", vec![0.0, 1.0, 0.0, 0.0])
            .with_pinned("c", vec![0.9, 0.1, 0.0, 0.0]),
    )
}

fn quiet(config: StoreConfig) -> StoreConfig {
    config.warmup(false)
}

fn build(
    config: StoreConfig,
    ram: RamCacheConfig,
    fallback: Option<MockVectorStore>,
) -> TestStore {
    CachedVectorStore::new(config, ram, embedder(), fallback).expect("valid store")
}

fn chunk(id: &str) -> DocumentChunk {
    DocumentChunk::new(id, id)
}

fn ids(hits: &[crate::cache::SearchHit]) -> Vec<&str> {
    hits.iter().map(|h| h.id.as_str()).collect()
}

#[tokio::test]
async fn test_text_add_and_search() {
    let store = build(StoreConfig::ram_only(), ram_config(10), None);
    store
        .add_documents(&[chunk("a"), chunk("b"), chunk("c")])
        .await
        .unwrap();

    let hits = store.search("a", 2).await.unwrap();

    assert_eq!(ids(&hits), vec!["a", "c"]);
    assert!(hits[0].score <= hits[1].score);
}

#[tokio::test]
async fn test_memo_avoids_repeat_embedding() {
    let store = build(StoreConfig::ram_only(), ram_config(10), None);
    store.add_documents(&[chunk("a")]).await.unwrap();
    store.search("a", 1).await.unwrap();
    store.search("a", 1).await.unwrap();

    assert_eq!(store.embedder().calls(), 1);
    let memo = store.get_stats().memo;
    assert_eq!(memo.entries, 1);
    assert_eq!(memo.hits, 2);
}

#[tokio::test]
async fn test_vector_query_skips_embedder() {
    let store = build(StoreConfig::ram_only(), ram_config(10), None);
    store
        .add_documents_with_embeddings(&[chunk("x")], &[vec![0.0, 0.0, 1.0, 0.0]])
        .await
        .unwrap();

    let hits = store.search(vec![0.0, 0.0, 1.0, 0.0], 1).await.unwrap();

    assert_eq!(ids(&hits), vec!["x"]);
    assert_eq!(store.embedder().calls(), 0);
}

#[tokio::test]
async fn test_embedding_failure_skips_fallback() {
    let config = quiet(StoreConfig::default().mirror_mode(MirrorMode::Disabled));
    let store = build(config, ram_config(10), Some(MockVectorStore::new()));
    store.embedder().set_failing(true);

    let err = store.add_documents(&[chunk("a")]).await.unwrap_err();

    assert_eq!(err.kind(), CacheErrorKind::EmbeddingSource);
    assert_eq!(store.fallback().unwrap().add_calls(), 0);
}

#[tokio::test]
async fn test_capacity_failure_degrades_to_fallback() {
    let config = quiet(StoreConfig::default().mirror_mode(MirrorMode::Disabled));
    let ram = ram_config(1).eviction(EvictionStrategy::Disabled);
    let store = build(config, ram, Some(MockVectorStore::new()));

    store.add_documents(&[chunk("a")]).await.unwrap();
    store.add_documents(&[chunk("b")]).await.unwrap();

    let fallback = store.fallback().unwrap();
    assert!(fallback.contains("b"));
    assert!(!fallback.contains("a"));
    assert_eq!(store.get_stats().fallback_adds, 1);
    assert_eq!(store.ram_cache().unwrap().len(), 1);
}

#[tokio::test]
async fn test_capacity_failure_with_failing_fallback_returns_ram_error() {
    let config = quiet(StoreConfig::default().mirror_mode(MirrorMode::Disabled));
    let ram = ram_config(1).eviction(EvictionStrategy::Disabled);
    let store = build(config, ram, Some(MockVectorStore::failing()));

    store.add_documents(&[chunk("a")]).await.unwrap();
    let err = store.add_documents(&[chunk("b")]).await.unwrap_err();

    assert!(matches!(err, CacheError::Capacity { .. }));
    assert_eq!(store.get_stats().fallback_failures, 1);
}

#[tokio::test]
async fn test_capacity_failure_without_fallback_propagates() {
    let ram = ram_config(1).eviction(EvictionStrategy::Disabled);
    let store = build(StoreConfig::ram_only(), ram, None);

    store.add_documents(&[chunk("a")]).await.unwrap();
    let err = store.add_documents(&[chunk("b")]).await.unwrap_err();

    assert_eq!(err.kind(), CacheErrorKind::Capacity);
}

#[tokio::test]
async fn test_disabled_fallback_is_not_consulted() {
    let config = quiet(
        StoreConfig::default()
            .fallback_enabled(false)
            .mirror_mode(MirrorMode::Synchronous),
    );
    let ram = ram_config(1).eviction(EvictionStrategy::Disabled);
    let store = build(config, ram, Some(MockVectorStore::new()));

    store.add_documents(&[chunk("a")]).await.unwrap();
    assert!(store.add_documents(&[chunk("b")]).await.is_err());

    assert_eq!(store.fallback().unwrap().add_calls(), 0);
    assert!(!store.get_stats().fallback_active);
}

#[tokio::test]
async fn test_broken_ram_search_uses_fallback() {
    let config = quiet(StoreConfig::default().mirror_mode(MirrorMode::Synchronous));
    let store = build(config, ram_config(10), Some(MockVectorStore::new()));
    store.add_documents(&[chunk("a"), chunk("b")]).await.unwrap();

    store.ram_cache().unwrap().poison();
    let hits = store.search("a", 1).await.unwrap();

    assert_eq!(ids(&hits), vec!["a"]);
    assert_eq!(store.get_stats().fallback_searches, 1);
}

#[tokio::test]
async fn test_double_failure_returns_original_ram_error() {
    let config = quiet(StoreConfig::default().mirror_mode(MirrorMode::Disabled));
    let store = build(config, ram_config(10), Some(MockVectorStore::failing()));
    store.ram_cache().unwrap().poison();

    let err = store.search("a", 1).await.unwrap_err();

    assert_eq!(err.kind(), CacheErrorKind::Unavailable);
    assert_eq!(store.fallback().unwrap().search_calls(), 1);
}

#[tokio::test]
async fn test_dimension_mismatch_search_falls_back() {
    let config = quiet(StoreConfig::default().mirror_mode(MirrorMode::Disabled));
    let store = build(config, ram_config(10), Some(MockVectorStore::new()));

    let hits = store.search(vec![1.0, 0.0], 3).await.unwrap();

    assert!(hits.is_empty());
    assert_eq!(store.fallback().unwrap().search_calls(), 1);
}

#[tokio::test]
async fn test_synchronous_mirror_writes_both_stores() {
    let config = quiet(StoreConfig::default().mirror_mode(MirrorMode::Synchronous));
    let store = build(config, ram_config(10), Some(MockVectorStore::new()));

    store.add_documents(&[chunk("a")]).await.unwrap();

    assert!(store.ram_cache().unwrap().contains("a").unwrap());
    assert!(store.fallback().unwrap().contains("a"));
    assert_eq!(store.get_stats().mirror_writes, 1);
}

#[tokio::test]
async fn test_synchronous_mirror_failure_surfaces() {
    let config = quiet(StoreConfig::default().mirror_mode(MirrorMode::Synchronous));
    let store = build(config, ram_config(10), Some(MockVectorStore::failing()));

    let err = store.add_documents(&[chunk("a")]).await.unwrap_err();

    assert_eq!(err.kind(), CacheErrorKind::Fallback);
    assert!(store.ram_cache().unwrap().contains("a").unwrap());
    assert_eq!(store.get_stats().mirror_failures, 1);
}

#[tokio::test]
async fn test_background_mirror_completes_after_wait() {
    let config = quiet(StoreConfig::default().mirror_mode(MirrorMode::Background));
    let store = build(config, ram_config(10), Some(MockVectorStore::new()));

    store.add_documents(&[chunk("a"), chunk("b")]).await.unwrap();
    assert_eq!(store.wait_for_background_tasks().await, 1);

    assert_eq!(store.fallback().unwrap().point_count(), 2);
    assert_eq!(store.get_stats().mirror_writes, 1);
    assert_eq!(store.get_stats().background_tasks, 0);
}

fn slow_mirror_store() -> TestStore {
    let config = quiet(StoreConfig::default().mirror_mode(MirrorMode::Background));
    let fallback = MockVectorStore::new().with_add_delay(Duration::from_millis(100));
    build(config, ram_config(10), Some(fallback))
}

#[tokio::test]
async fn test_cancelled_wait_keeps_mirror_write() {
    let store = slow_mirror_store();
    store.add_documents(&[chunk("a")]).await.unwrap();

    let waited = tokio::time::timeout(
        Duration::from_millis(10),
        store.wait_for_background_tasks(),
    )
    .await;
    assert!(waited.is_err());
    assert_eq!(store.get_stats().background_tasks, 1);

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(store.fallback().unwrap().point_count(), 1);
    assert_eq!(store.get_stats().mirror_writes, 1);
    assert_eq!(store.get_stats().background_tasks, 0);
}

#[tokio::test]
async fn test_concurrent_waiters_both_see_mirror_write() {
    let store = slow_mirror_store();
    store.add_documents(&[chunk("a")]).await.unwrap();

    let store = &store;
    let waiter = move || async move {
        store.wait_for_background_tasks().await;
        store.fallback().unwrap().point_count()
    };
    let (first, second, in_flight) = tokio::join!(waiter(), waiter(), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        store.get_stats().background_tasks
    });

    assert_eq!(first, 1);
    assert_eq!(second, 1);
    assert_eq!(in_flight, 1);
}

#[tokio::test]
async fn test_panicking_background_task_is_drained() {
    let tasks = BackgroundTasks::new();
    tasks.spawn(async {
        panic!("background task failure");
    });
    tasks.spawn(async {});

    assert_eq!(tasks.wait_all().await, 2);
    assert!(tasks.is_empty());
    assert_eq!(tasks.wait_all().await, 0);
}

#[tokio::test]
async fn test_background_mirror_failure_is_not_raised() {
    let config = quiet(StoreConfig::default().mirror_mode(MirrorMode::Background));
    let store = build(config, ram_config(10), Some(MockVectorStore::failing()));

    store.add_documents(&[chunk("a")]).await.unwrap();
    store.wait_for_background_tasks().await;

    assert_eq!(store.get_stats().mirror_failures, 1);
    assert_eq!(store.search("a", 1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_ram_disabled_routes_to_fallback() {
    let config = quiet(StoreConfig::default().ram_cache_enabled(false));
    let store = build(config, ram_config(10), Some(MockVectorStore::new()));

    store.add_documents(&[chunk("a"), chunk("b")]).await.unwrap();
    let hits = store.search("b", 1).await.unwrap();

    assert!(store.ram_cache().is_none());
    assert!(store.get_memory_usage().is_none());
    assert_eq!(ids(&hits), vec!["b"]);
    assert_eq!(store.get_stats().fallback_searches, 1);
}

#[tokio::test]
async fn test_ram_disabled_surfaces_fallback_errors() {
    let config = quiet(StoreConfig::default().ram_cache_enabled(false));
    let store = build(config, ram_config(10), Some(MockVectorStore::failing()));

    let err = store.add_documents(&[chunk("a")]).await.unwrap_err();
    assert_eq!(err.kind(), CacheErrorKind::Fallback);
    let err = store.search("a", 1).await.unwrap_err();
    assert_eq!(err.kind(), CacheErrorKind::Fallback);
}

#[tokio::test]
async fn test_warmup_primes_memo() {
    let config = StoreConfig::ram_only()
        .warmup(true)
        .warmup_queries(["first question", "second question"]);
    let store = build(config, ram_config(10), None);

    store.wait_for_background_tasks().await;

    assert!(store.memo().contains("first question"));
    assert!(store.memo().contains("second question"));
    assert_eq!(store.embedder().calls(), 2);
}

#[tokio::test]
async fn test_warmup_failure_does_not_block() {
    let embedder = Arc::new(MockEmbedder::new(DIM));
    embedder.set_failing(true);
    let config = StoreConfig::ram_only()
        .warmup(true)
        .warmup_queries(["q"]);
    let store: TestStore =
        CachedVectorStore::new(config, ram_config(10), Arc::clone(&embedder), None).unwrap();

    store.wait_for_background_tasks().await;
    embedder.set_failing(false);

    assert!(store.memo().is_empty());
    store.add_documents(&[chunk("q")]).await.unwrap();
    assert_eq!(store.ram_cache().unwrap().len(), 1);
}

#[test]
fn test_warmup_skipped_without_runtime() {
    let config = StoreConfig::ram_only().warmup(true);
    let store = build(config, ram_config(10), None);

    assert_eq!(store.get_stats().background_tasks, 0);
}

#[tokio::test]
async fn test_optimize_trims_memo_to_retain() {
    let config = StoreConfig::ram_only().memo_limits(3, 1);
    let store = build(config, ram_config(10), None);
    let chunks: Vec<_> = (0..5).map(|i| chunk(&format!("doc {i}"))).collect();
    store.add_documents(&chunks).await.unwrap();

    assert_eq!(store.optimize(), 4);
    assert_eq!(store.memo().len(), 1);
    assert!(store.memo().contains("doc 4"));
    assert_eq!(store.optimize(), 0);
}

#[tokio::test]
async fn test_clear_leaves_fallback_alone() {
    let config = quiet(StoreConfig::default().mirror_mode(MirrorMode::Synchronous));
    let store = build(config, ram_config(10), Some(MockVectorStore::new()));
    store.add_documents(&[chunk("a")]).await.unwrap();

    store.clear().await.unwrap();

    assert!(store.ram_cache().unwrap().is_empty());
    assert!(store.memo().is_empty());
    assert_eq!(store.fallback().unwrap().point_count(), 1);
    assert_eq!(store.fallback().unwrap().clear_calls(), 0);
}

#[tokio::test]
async fn test_length_mismatch_rejected_before_any_store() {
    let config = quiet(StoreConfig::default().mirror_mode(MirrorMode::Synchronous));
    let store = build(config, ram_config(10), Some(MockVectorStore::new()));

    let err = store
        .add_documents_with_embeddings(&[chunk("a"), chunk("b")], &[vec![1.0; DIM]])
        .await
        .unwrap_err();

    assert_eq!(err.kind(), CacheErrorKind::LengthMismatch);
    assert_eq!(store.fallback().unwrap().add_calls(), 0);
}

#[tokio::test]
async fn test_store_is_a_vector_store() {
    async fn roundtrip<S: VectorStore>(store: &S) -> usize {
        store
            .add(&[chunk("v")], &[vec![0.0, 0.0, 0.0, 1.0]])
            .await
            .ok();
        store
            .search(&[0.0, 0.0, 0.0, 1.0], 1)
            .await
            .map(|hits| hits.len())
            .unwrap_or(0)
    }

    let store = build(StoreConfig::ram_only(), ram_config(10), None);
    assert_eq!(roundtrip(&store).await, 1);
}

#[test]
fn test_new_rejects_dimension_disagreement() {
    let err = CachedVectorStore::<MockVectorStore, MockEmbedder>::new(
        StoreConfig::ram_only(),
        RamCacheConfig::new(1_000_000, 8, 10),
        embedder(),
        None,
    )
    .unwrap_err();

    assert_eq!(err.kind(), CacheErrorKind::Config);
}

#[test]
fn test_new_rejects_ram_disabled_without_fallback() {
    let config = StoreConfig::default().ram_cache_enabled(false).warmup(false);
    let err = TestStore::new(config, ram_config(10), embedder(), None).unwrap_err();
    assert_eq!(err.kind(), CacheErrorKind::Config);
}

#[test]
fn test_store_config_validation() {
    assert!(StoreConfig::default().validate().is_ok());
    assert!(StoreConfig::default().memo_limits(10, 20).validate().is_err());
    assert!(
        StoreConfig::default()
            .ram_cache_enabled(false)
            .fallback_enabled(false)
            .validate()
            .is_err()
    );
}

#[test]
fn test_mirror_mode_parse() {
    assert_eq!("sync".parse::<MirrorMode>(), Ok(MirrorMode::Synchronous));
    assert_eq!("Background".parse::<MirrorMode>(), Ok(MirrorMode::Background));
    assert_eq!("off".parse::<MirrorMode>(), Ok(MirrorMode::Disabled));
    assert!("eventually".parse::<MirrorMode>().is_err());
    assert_eq!(MirrorMode::default(), MirrorMode::Background);
}
