//! Pre-allocated embedding arena.
//!
//! One zeroed buffer is carved into four regions (vectors, metadata, index, LRU tracking) at
//! construction. The vector region is divided into fixed-size slots of `embedding_dim` floats,
//! handed out and reclaimed by a [`SlotAllocator`]. Documents refer to their embedding by
//! [`SlotIndex`]; nothing outside the arena owns vector bytes.

mod allocator;
mod layout;


pub use allocator::{SlotAllocator, SlotIndex};
pub use layout::{Region, RegionLayout, RegionSpan};

use std::ops::Range;

use crate::constants::F32_BYTES;

/// Single contiguous allocation backing every cached embedding.
pub struct MemoryArena {
    buffer: Vec<f32>,
    layout: RegionLayout,
    allocator: SlotAllocator,
}

impl std::fmt::Debug for MemoryArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryArena")
            .field("layout", &self.layout)
            .field("live_slots", &self.allocator.live())
            .field("slot_capacity", &self.allocator.capacity())
            .finish()
    }
}

impl MemoryArena {
    /// Allocates the whole budget up front (zeroed).
    pub fn new(layout: RegionLayout) -> Self {
        let slots = layout.slot_capacity();
        Self::with_slot_limit(layout, slots)
    }

    /// Like [`new`](Self::new), but hands out at most `limit` slots.
    pub fn with_slot_limit(layout: RegionLayout, limit: usize) -> Self {
        let words = layout.total_bytes() / F32_BYTES;
        let allocator = SlotAllocator::new(layout.slot_capacity().min(limit));
        Self {
            buffer: vec![0.0; words],
            layout,
            allocator,
        }
    }

    #[inline]
    pub fn layout(&self) -> &RegionLayout {
        &self.layout
    }

    #[inline]
    pub fn embedding_dim(&self) -> usize {
        self.layout.embedding_dim()
    }

    #[inline]
    pub fn slot_bytes(&self) -> usize {
        self.layout.slot_bytes()
    }

    #[inline]
    pub fn slot_capacity(&self) -> usize {
        self.allocator.capacity()
    }

    #[inline]
    pub fn live_slots(&self) -> usize {
        self.allocator.live()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.allocator.is_full()
    }

    /// Claims a free slot. `None` means the caller must evict first.
    #[inline]
    pub fn allocate(&mut self) -> Option<SlotIndex> {
        self.allocator.allocate()
    }

    /// Zeroes the slot and makes it available to [`allocate`](Self::allocate) again.
    pub fn deallocate(&mut self, slot: SlotIndex) {
        let range = self.slot_range(slot);
        self.allocator.deallocate(slot);
        self.buffer[range].fill(0.0);
    }

    #[inline]
    pub fn is_allocated(&self, slot: SlotIndex) -> bool {
        self.allocator.is_allocated(slot)
    }

    /// Byte offset of the slot within the vector region.
    #[inline]
    pub fn byte_offset(&self, slot: SlotIndex) -> usize {
        self.layout.slot_offset(slot)
    }

    /// Embedding stored in a live slot.
    #[inline]
    pub fn slot(&self, slot: SlotIndex) -> &[f32] {
        debug_assert!(self.is_allocated(slot), "read of free slot {slot}");
        &self.buffer[self.slot_range(slot)]
    }

    /// Copies an embedding into a live slot.
    ///
    /// # Panics
    ///
    /// Panics if the slot is free or the embedding length differs from the arena dimension.
    /// Callers validate dimensions before reaching the arena.
    pub fn write_slot(&mut self, slot: SlotIndex, embedding: &[f32]) {
        assert!(self.is_allocated(slot), "write to free slot {slot}");
        assert_eq!(
            embedding.len(),
            self.embedding_dim(),
            "embedding length must match arena dimension"
        );
        let range = self.slot_range(slot);
        self.buffer[range].copy_from_slice(embedding);
    }

    /// Live slots in ascending order.
    pub fn occupied_slots(&self) -> impl Iterator<Item = SlotIndex> + '_ {
        self.allocator.occupied()
    }

    /// Raw bytes of a region.
    pub fn region_bytes(&self, region: Region) -> &[u8] {
        let span = self.layout.span(region);
        let words = span.offset / F32_BYTES..span.end() / F32_BYTES;
        bytemuck::cast_slice(&self.buffer[words])
    }

    /// Zeroes every region and releases every slot.
    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.allocator.reset();
    }

    fn slot_range(&self, slot: SlotIndex) -> Range<usize> {
        let dim = self.embedding_dim();
        let start = self.layout.slot_offset(slot) / F32_BYTES;
        start..start + dim
    }
}
