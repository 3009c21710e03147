//! Test fixtures for integration tests.

#![allow(dead_code)]

use stratum::cache::{DocumentChunk, Metadata, RamCacheConfig};

pub const TEST_DIM: usize = 8;

pub const DEFAULT_COURSE: &str = "CS-101";

/// Budget that leaves room for far more documents than the tests insert.
pub const ROOMY_BUDGET_BYTES: usize = 1_000_000;

#[derive(Default)]
pub struct ChunkBuilder {
    id: Option<String>,
    text: Option<String>,
    course: Option<String>,
    week: Option<u64>,
}

impl ChunkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn course(mut self, course: impl Into<String>) -> Self {
        self.course = Some(course.into());
        self
    }

    pub fn week(mut self, week: u64) -> Self {
        self.week = Some(week);
        self
    }

    pub fn build(self) -> DocumentChunk {
        let id = self.id.unwrap_or_else(|| "chunk-0".to_string());
        let text = self.text.unwrap_or_else(|| format!("content of {id}"));

        let mut metadata = Metadata::new();
        metadata.insert(
            "course".to_string(),
            self.course.unwrap_or_else(|| DEFAULT_COURSE.to_string()).into(),
        );
        if let Some(week) = self.week {
            metadata.insert("week".to_string(), week.into());
        }

        DocumentChunk::new(id, text).with_metadata(metadata)
    }
}

/// `count` chunks with ids `doc-0..doc-{count}`.
pub fn sample_chunks(count: usize) -> Vec<DocumentChunk> {
    (0..count)
        .map(|i| {
            ChunkBuilder::new()
                .id(format!("doc-{i}"))
                .week((i % 14) as u64)
                .build()
        })
        .collect()
}

/// Deterministic non-zero embedding for `seed`.
pub fn seeded_embedding(seed: u64, dim: usize) -> Vec<f32> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..dim)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 33) as f32 / u32::MAX as f32) + 0.01
        })
        .collect()
}

pub fn seeded_embeddings(count: usize, dim: usize) -> Vec<Vec<f32>> {
    (0..count as u64).map(|i| seeded_embedding(i, dim)).collect()
}

/// Basis vector `e_axis`.
pub fn unit(axis: usize, dim: usize) -> Vec<f32> {
    let mut v = vec![0.0; dim];
    v[axis % dim] = 1.0;
    v
}

pub fn roomy_config(max_documents: usize) -> RamCacheConfig {
    RamCacheConfig::new(ROOMY_BUDGET_BYTES, TEST_DIM, max_documents)
}
