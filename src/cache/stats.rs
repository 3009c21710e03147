use std::time::Duration;

use super::types::CacheStats;

/// Incrementally maintained counters behind [`CacheStats`].
#[derive(Debug, Default, Clone)]
pub(crate) struct StatsTracker {
    document_count: usize,
    bytes_used: usize,
    document_heap_bytes: usize,
    searches: u64,
    hits: u64,
    avg_search_time_us: f64,
    last_search_time_us: u64,
    evictions: u64,
    insertions: u64,
}

impl StatsTracker {
    pub fn record_insert(&mut self, slot_bytes: usize, heap_bytes: usize) {
        self.document_count += 1;
        self.bytes_used += slot_bytes;
        self.document_heap_bytes += heap_bytes;
        self.insertions += 1;
    }

    pub fn record_update(&mut self, old_heap_bytes: usize, new_heap_bytes: usize) {
        self.document_heap_bytes = self.document_heap_bytes - old_heap_bytes + new_heap_bytes;
        self.insertions += 1;
    }

    pub fn record_removal(&mut self, slot_bytes: usize, heap_bytes: usize, evicted: bool) {
        self.document_count -= 1;
        self.bytes_used -= slot_bytes;
        self.document_heap_bytes -= heap_bytes;
        if evicted {
            self.evictions += 1;
        }
    }

    /// Cumulative moving average over every search since the last reset.
    pub fn record_search(&mut self, elapsed: Duration, found: bool) {
        let micros = elapsed.as_micros().min(u64::MAX as u128) as u64;
        self.searches += 1;
        if found {
            self.hits += 1;
        }
        self.last_search_time_us = micros;
        self.avg_search_time_us +=
            (micros as f64 - self.avg_search_time_us) / self.searches as f64;
    }

    pub fn document_heap_bytes(&self) -> usize {
        self.document_heap_bytes
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn snapshot(&self) -> CacheStats {
        let hit_rate = if self.searches > 0 {
            self.hits as f64 / self.searches as f64
        } else {
            0.0
        };

        CacheStats {
            document_count: self.document_count,
            bytes_used: self.bytes_used,
            searches: self.searches,
            hits: self.hits,
            hit_rate,
            avg_search_time_us: self.avg_search_time_us,
            last_search_time_us: self.last_search_time_us,
            evictions: self.evictions,
            insertions: self.insertions,
        }
    }
}
