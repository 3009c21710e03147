use bitvec::vec::BitVec;

/// Index of a fixed-size embedding slot inside the vector region.
pub type SlotIndex = u32;

/// Free-list allocator over the vector region's slots.
///
/// Occupancy is mirrored in a bitmap so that liveness checks and ordered iteration over live
/// slots never walk the free list.
#[derive(Debug, Clone)]
pub struct SlotAllocator {
    occupied: BitVec,
    free: Vec<SlotIndex>,
}

impl SlotAllocator {
    pub fn new(capacity: usize) -> Self {
        Self {
            occupied: BitVec::repeat(false, capacity),
            free: Self::fresh_free_list(capacity),
        }
    }

    // Reversed so that `pop` hands out slot 0 first.
    fn fresh_free_list(capacity: usize) -> Vec<SlotIndex> {
        (0..capacity as SlotIndex).rev().collect()
    }

    /// Claims a free slot, or `None` when every slot is live.
    #[inline]
    pub fn allocate(&mut self) -> Option<SlotIndex> {
        let slot = self.free.pop()?;
        debug_assert!(!self.is_allocated(slot), "free list handed out live slot {slot}");
        self.occupied.set(slot as usize, true);
        Some(slot)
    }

    /// Returns a slot to the free list.
    ///
    /// # Panics
    ///
    /// Panics if the slot is not currently allocated.
    #[inline]
    pub fn deallocate(&mut self, slot: SlotIndex) {
        assert!(
            self.is_allocated(slot),
            "deallocate of slot {slot} which is not allocated"
        );
        self.occupied.set(slot as usize, false);
        self.free.push(slot);
    }

    #[inline]
    pub fn is_allocated(&self, slot: SlotIndex) -> bool {
        self.occupied
            .get(slot as usize)
            .map(|bit| *bit)
            .unwrap_or(false)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.occupied.len()
    }

    #[inline]
    pub fn live(&self) -> usize {
        self.capacity() - self.free.len()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }

    /// Live slots in ascending order.
    pub fn occupied(&self) -> impl Iterator<Item = SlotIndex> + '_ {
        self.occupied.iter_ones().map(|i| i as SlotIndex)
    }

    pub fn reset(&mut self) {
        self.occupied.fill(false);
        self.free = Self::fresh_free_list(self.capacity());
    }
}
