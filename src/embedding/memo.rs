use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use serde::Serialize;

use crate::hashing::hash_text;

type MemoKey = [u8; 32];

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MemoStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

#[derive(Debug, Default)]
struct MemoInner {
    entries: HashMap<MemoKey, Vec<f32>>,
    /// Keys in first-insertion order, oldest at the front.
    order: VecDeque<MemoKey>,
    hits: u64,
    misses: u64,
}

/// Embedding results keyed by the BLAKE3 hash of the exact input text.
///
/// Grows without bound until [`trim`](Self::trim) is called.
#[derive(Debug, Default)]
pub struct EmbeddingMemo {
    inner: Mutex<MemoInner>,
}

impl EmbeddingMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached embedding for `text`, counted as a hit or miss.
    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        let key = hash_text(text);
        let mut inner = self.inner.lock();
        match inner.entries.get(&key).cloned() {
            Some(embedding) => {
                inner.hits += 1;
                Some(embedding)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Stores an embedding. Replacing an existing entry keeps its original age.
    pub fn insert(&self, text: &str, embedding: Vec<f32>) {
        let key = hash_text(text);
        let mut inner = self.inner.lock();
        if inner.entries.insert(key, embedding).is_none() {
            inner.order.push_back(key);
        }
    }

    pub fn contains(&self, text: &str) -> bool {
        self.inner.lock().entries.contains_key(&hash_text(text))
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Once more than `threshold` entries are held, drops the oldest until `retain` remain.
    /// Returns how many entries were removed.
    pub fn trim(&self, threshold: usize, retain: usize) -> usize {
        let mut inner = self.inner.lock();
        if inner.entries.len() <= threshold {
            return 0;
        }

        let mut removed = 0;
        while inner.entries.len() > retain {
            let Some(key) = inner.order.pop_front() else {
                break;
            };
            if inner.entries.remove(&key).is_some() {
                removed += 1;
            }
        }
        removed
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
        inner.hits = 0;
        inner.misses = 0;
    }

    pub fn stats(&self) -> MemoStats {
        let inner = self.inner.lock();
        let lookups = inner.hits + inner.misses;
        MemoStats {
            entries: inner.entries.len(),
            hits: inner.hits,
            misses: inner.misses,
            hit_rate: if lookups > 0 {
                inner.hits as f64 / lookups as f64
            } else {
                0.0
            },
        }
    }
}
