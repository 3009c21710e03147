use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::cache::{DocumentChunk, SearchHit};
use crate::similarity::cosine_distance;
use crate::vectordb::{StoreOp, VectorDbError, VectorStore};

const MOCK_COLLECTION: &str = "mock";

fn poisoned(op: StoreOp) -> VectorDbError {
    VectorDbError::operation(op, MOCK_COLLECTION, "lock poisoned")
}

#[derive(Clone)]
struct MockStoredPoint {
    chunk: DocumentChunk,
    vector: Vec<f32>,
}

/// In-memory [`VectorStore`] with switchable failure injection and call counters.
#[derive(Default)]
pub struct MockVectorStore {
    points: RwLock<BTreeMap<String, MockStoredPoint>>,
    dimension: Option<usize>,
    add_delay: Option<Duration>,
    failing: AtomicBool,
    adds: AtomicUsize,
    searches: AtomicUsize,
    clears: AtomicUsize,
}

impl std::fmt::Debug for MockVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockVectorStore")
            .field("dimension", &self.dimension)
            .field("failing", &self.failing.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl MockVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects vectors whose length differs from `dimension`.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: Some(dimension),
            ..Self::default()
        }
    }

    /// Holds every `add` for `delay` before it writes, to keep background writes in flight.
    pub fn with_add_delay(mut self, delay: Duration) -> Self {
        self.add_delay = Some(delay);
        self
    }

    /// A store whose every call fails until [`set_failing(false)`](Self::set_failing).
    pub fn failing() -> Self {
        let store = Self::default();
        store.set_failing(true);
        store
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn point_count(&self) -> usize {
        self.points.read().map(|p| p.len()).unwrap_or(0)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.points
            .read()
            .map(|p| p.contains_key(id))
            .unwrap_or(false)
    }

    pub fn add_calls(&self) -> usize {
        self.adds.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn clear_calls(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    /// Poisons the internal lock for testing error handling paths.
    pub fn poison_lock(&self) {
        std::thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = self.points.write();
                    panic!("Intentional panic to poison lock for testing");
                })
                .join();
        });
    }

    fn check_available(&self) -> Result<(), VectorDbError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(VectorDbError::Unavailable {
                message: "mock store set to fail".to_string(),
            });
        }
        Ok(())
    }

    fn check_dim(&self, vector: &[f32]) -> Result<(), VectorDbError> {
        match self.dimension {
            Some(expected) if expected != vector.len() => Err(VectorDbError::InvalidDimension {
                expected,
                actual: vector.len(),
            }),
            _ => Ok(()),
        }
    }
}

impl VectorStore for MockVectorStore {
    type Error = VectorDbError;

    async fn add(
        &self,
        chunks: &[DocumentChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), VectorDbError> {
        self.adds.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        if let Some(delay) = self.add_delay {
            tokio::time::sleep(delay).await;
        }
        if chunks.len() != embeddings.len() {
            return Err(VectorDbError::LengthMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }
        for embedding in embeddings {
            self.check_dim(embedding)?;
        }

        let mut points = self
            .points
            .write()
            .map_err(|_| poisoned(StoreOp::Upsert))?;
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            points.insert(
                chunk.id.clone(),
                MockStoredPoint {
                    chunk: chunk.clone(),
                    vector: embedding.clone(),
                },
            );
        }
        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, VectorDbError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        self.check_dim(query)?;

        let points = self
            .points
            .read()
            .map_err(|_| poisoned(StoreOp::Search))?;

        let mut hits: Vec<SearchHit> = points
            .values()
            .map(|p| SearchHit {
                id: p.chunk.id.clone(),
                text: p.chunk.text.clone(),
                metadata: p.chunk.metadata.clone(),
                score: cosine_distance(query, &p.vector),
            })
            .collect();

        // Stable sort over id order keeps ties deterministic.
        hits.sort_by(|a, b| a.score.total_cmp(&b.score));
        hits.truncate(k);
        Ok(hits)
    }

    async fn clear(&self) -> Result<(), VectorDbError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        self.points
            .write()
            .map_err(|_| poisoned(StoreOp::Delete))?
            .clear();
        Ok(())
    }
}
