use crate::constants::{
    DimConfig, F32_BYTES, INDEX_REGION_SHARE, LRU_REGION_SHARE, METADATA_REGION_SHARE,
    VECTOR_REGION_SHARE,
};

use super::allocator::SlotIndex;

/// One of the four fixed regions the arena budget is split into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Vectors,
    Metadata,
    Index,
    Lru,
}

impl Region {
    pub const ALL: [Region; 4] = [Region::Vectors, Region::Metadata, Region::Index, Region::Lru];
}

/// Byte range of a region inside the arena buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegionSpan {
    pub offset: usize,
    pub len: usize,
}

impl RegionSpan {
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Placement of the four regions inside a single budget.
///
/// Every span starts and ends on a 4-byte boundary so that no slot ever splits an `f32`. The
/// vector region is further trimmed to a whole number of slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionLayout {
    budget_bytes: usize,
    embedding_dim: usize,
    slot_bytes: usize,
    vectors: RegionSpan,
    metadata: RegionSpan,
    index: RegionSpan,
    lru: RegionSpan,
}

impl RegionLayout {
    pub fn new(budget_bytes: usize, embedding_dim: usize) -> Self {
        let slot_bytes = DimConfig::new(embedding_dim).slot_bytes();

        let vector_len = if slot_bytes == 0 {
            0
        } else {
            let raw = region_share(budget_bytes, VECTOR_REGION_SHARE);
            let slots = (raw / slot_bytes).min(MAX_SLOTS);
            slots * slot_bytes
        };
        let metadata_len = region_share(budget_bytes, METADATA_REGION_SHARE);
        let index_len = region_share(budget_bytes, INDEX_REGION_SHARE);
        let lru_len = region_share(budget_bytes, LRU_REGION_SHARE);

        let vectors = RegionSpan {
            offset: 0,
            len: vector_len,
        };
        let metadata = RegionSpan {
            offset: vectors.end(),
            len: metadata_len,
        };
        let index = RegionSpan {
            offset: metadata.end(),
            len: index_len,
        };
        let lru = RegionSpan {
            offset: index.end(),
            len: lru_len,
        };

        Self {
            budget_bytes,
            embedding_dim,
            slot_bytes,
            vectors,
            metadata,
            index,
            lru,
        }
    }

    #[inline]
    pub fn budget_bytes(&self) -> usize {
        self.budget_bytes
    }

    #[inline]
    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    #[inline]
    pub fn slot_bytes(&self) -> usize {
        self.slot_bytes
    }

    #[inline]
    pub fn span(&self, region: Region) -> RegionSpan {
        match region {
            Region::Vectors => self.vectors,
            Region::Metadata => self.metadata,
            Region::Index => self.index,
            Region::Lru => self.lru,
        }
    }

    /// Number of embedding slots the vector region holds.
    #[inline]
    pub fn slot_capacity(&self) -> usize {
        if self.slot_bytes == 0 {
            0
        } else {
            self.vectors.len / self.slot_bytes
        }
    }

    /// Bytes actually backed by the arena buffer (never more than the budget).
    #[inline]
    pub fn total_bytes(&self) -> usize {
        self.lru.end()
    }

    /// Byte offset of a slot from the start of the vector region.
    #[inline]
    pub fn slot_offset(&self, slot: SlotIndex) -> usize {
        self.vectors.offset + slot as usize * self.slot_bytes
    }
}

// The LRU tracker reserves `u32::MAX` as its null link.
const MAX_SLOTS: usize = (u32::MAX - 1) as usize;

fn region_share(budget_bytes: usize, share: f64) -> usize {
    let raw = (budget_bytes as f64 * share) as usize;
    raw - raw % F32_BYTES
}
