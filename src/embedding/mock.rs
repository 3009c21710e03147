//! Scriptable embedder for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Embedder, EmbeddingError, StubEmbedder};

/// Returns pinned vectors for known texts and stub embeddings otherwise.
#[derive(Debug)]
pub struct MockEmbedder {
    stub: StubEmbedder,
    pinned: Mutex<HashMap<String, Vec<f32>>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            stub: StubEmbedder::new(dimension),
            pinned: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Makes `text` embed to exactly `embedding`.
    pub fn pin(&self, text: impl Into<String>, embedding: Vec<f32>) {
        self.pinned.lock().insert(text.into(), embedding);
    }

    pub fn with_pinned(self, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        self.pin(text, embedding);
        self
    }

    /// While set, every call fails with [`EmbeddingError::InferenceFailed`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Calls made so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmbeddingError::InferenceFailed {
                reason: "mock embedder set to fail".to_string(),
            });
        }
        if let Some(embedding) = self.pinned.lock().get(text) {
            return Ok(embedding.clone());
        }
        Ok(self.stub.embed_sync(text))
    }

    fn dimension(&self) -> usize {
        self.stub.dimension()
    }

    fn name(&self) -> &str {
        "mock"
    }
}
