//! Recency ordering over arena slots.
//!
//! A doubly linked list whose links are slot indices into a `Vec` of nodes, so that insert,
//! promote, remove and victim selection are all O(1) without pointer juggling. Head is the most
//! recently used slot, tail the least.


use crate::arena::SlotIndex;

const NIL: SlotIndex = SlotIndex::MAX;

#[derive(Debug, Clone, Copy)]
struct Node {
    prev: SlotIndex,
    next: SlotIndex,
    linked: bool,
}

impl Node {
    const UNLINKED: Node = Node {
        prev: NIL,
        next: NIL,
        linked: false,
    };
}

/// LRU list keyed by [`SlotIndex`].
#[derive(Debug, Clone)]
pub struct LruTracker {
    nodes: Vec<Node>,
    head: SlotIndex,
    tail: SlotIndex,
    len: usize,
}

impl LruTracker {
    /// Creates a tracker able to hold slots `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: vec![Node::UNLINKED; capacity],
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn contains(&self, slot: SlotIndex) -> bool {
        self.nodes
            .get(slot as usize)
            .map(|node| node.linked)
            .unwrap_or(false)
    }

    /// Links a new slot at the head.
    ///
    /// # Panics
    ///
    /// Panics if the slot is already tracked.
    pub fn insert(&mut self, slot: SlotIndex) {
        assert!(!self.contains(slot), "slot {slot} is already tracked");
        self.push_front(slot);
        self.len += 1;
    }

    /// Promotes a tracked slot to most recently used.
    ///
    /// # Panics
    ///
    /// Panics if the slot is not tracked.
    pub fn touch(&mut self, slot: SlotIndex) {
        assert!(self.contains(slot), "touch of untracked slot {slot}");
        if self.head == slot {
            return;
        }
        self.unlink(slot);
        self.push_front(slot);
    }

    /// Removes a slot from anywhere in the list. Returns `false` if it was not tracked.
    pub fn remove(&mut self, slot: SlotIndex) -> bool {
        if !self.contains(slot) {
            return false;
        }
        self.unlink(slot);
        self.nodes[slot as usize] = Node::UNLINKED;
        self.len -= 1;
        true
    }

    /// Removes and returns the least recently used slot.
    pub fn evict_victim(&mut self) -> Option<SlotIndex> {
        let victim = self.peek_victim()?;
        self.remove(victim);
        Some(victim)
    }

    /// The slot [`evict_victim`](Self::evict_victim) would return.
    #[inline]
    pub fn peek_victim(&self) -> Option<SlotIndex> {
        (self.tail != NIL).then_some(self.tail)
    }

    /// Slots from most to least recently used.
    pub fn iter_mru(&self) -> impl Iterator<Item = SlotIndex> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            if cursor == NIL {
                return None;
            }
            let slot = cursor;
            cursor = self.nodes[slot as usize].next;
            Some(slot)
        })
    }

    pub fn clear(&mut self) {
        self.nodes.fill(Node::UNLINKED);
        self.head = NIL;
        self.tail = NIL;
        self.len = 0;
    }

    fn push_front(&mut self, slot: SlotIndex) {
        let old_head = self.head;
        self.nodes[slot as usize] = Node {
            prev: NIL,
            next: old_head,
            linked: true,
        };
        if old_head != NIL {
            self.nodes[old_head as usize].prev = slot;
        } else {
            self.tail = slot;
        }
        self.head = slot;
    }

    // Detaches the node but leaves it marked linked; callers relink or reset it.
    fn unlink(&mut self, slot: SlotIndex) {
        let Node { prev, next, .. } = self.nodes[slot as usize];
        if prev != NIL {
            self.nodes[prev as usize].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.nodes[next as usize].prev = prev;
        } else {
            self.tail = prev;
        }
    }
}
