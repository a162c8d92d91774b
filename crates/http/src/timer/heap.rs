use std::time::Instant;

use slab::Slab;

use crate::timer::{Expire, TimerId, TimerStore};

const INIT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy)]
struct HeapNode {
    deadline: Instant,
    generation: u64,
    key: usize,
}

impl HeapNode {
    /// Earlier deadline first, insertion order among equal deadlines.
    #[inline]
    fn precedes(&self, other: &Self) -> bool {
        (self.deadline, self.generation) < (other.deadline, other.generation)
    }
}

#[derive(Debug)]
struct Slot<T> {
    owner: Option<T>,
    generation: u64,
}

/// Array backed binary min-heap of deadlines.
///
/// Removal is lazy: the owner is taken out right away but the node stays in the
/// heap until it reaches the top, where it is discarded without firing.
#[derive(Debug)]
pub struct TimeHeap<T> {
    heap: Vec<HeapNode>,
    slots: Slab<Slot<T>>,
    live: usize,
    generation: u64,
}

impl<T> TimeHeap<T> {
    pub fn new() -> Self {
        Self::with_capacity(INIT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { heap: Vec::with_capacity(capacity), slots: Slab::with_capacity(capacity), live: 0, generation: 0 }
    }

    /// Builds a heap from a batch of entries in one pass and returns their ids in input order.
    pub fn from_entries<I>(entries: I) -> (Self, Vec<TimerId>)
    where
        I: IntoIterator<Item = (Instant, T)>,
    {
        let entries = entries.into_iter();
        let mut this = Self::with_capacity(entries.size_hint().0.max(INIT_CAPACITY));
        let mut ids = Vec::with_capacity(entries.size_hint().0);
        for (deadline, owner) in entries {
            let (node, id) = this.new_node(deadline, owner);
            this.heap.push(node);
            ids.push(id);
        }
        for index in (0..this.heap.len() / 2).rev() {
            this.sift_down(index);
        }
        (this, ids)
    }

    /// Deadline at the top of the heap. It may belong to a removed entry.
    pub fn peek_deadline(&self) -> Option<Instant> {
        self.heap.first().map(|node| node.deadline)
    }

    /// Removes and returns the earliest live entry, discarding removed ones on the way.
    pub fn pop(&mut self) -> Option<(Instant, T)> {
        while let Some(node) = self.pop_node() {
            if let Some(owner) = self.slots.remove(node.key).owner {
                self.live -= 1;
                return Some((node.deadline, owner));
            }
        }
        None
    }

    fn new_node(&mut self, deadline: Instant, owner: T) -> (HeapNode, TimerId) {
        self.generation += 1;
        let key = self.slots.insert(Slot { owner: Some(owner), generation: self.generation });
        self.live += 1;
        (HeapNode { deadline, generation: self.generation, key }, TimerId::new(key, self.generation))
    }

    fn pop_node(&mut self) -> Option<HeapNode> {
        let last = self.heap.len().checked_sub(1)?;
        self.heap.swap(0, last);
        let node = self.heap.pop();
        self.sift_down(0);
        node
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if !self.heap[index].precedes(&self.heap[parent]) {
                break;
            }
            self.heap.swap(index, parent);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut smallest = index;
            if left < len && self.heap[left].precedes(&self.heap[smallest]) {
                smallest = left;
            }
            if right < len && self.heap[right].precedes(&self.heap[smallest]) {
                smallest = right;
            }
            if smallest == index {
                break;
            }
            self.heap.swap(index, smallest);
            index = smallest;
        }
    }
}

impl<T> Default for TimeHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerStore<T> for TimeHeap<T> {
    fn insert(&mut self, deadline: Instant, owner: T) -> TimerId {
        if self.heap.len() == self.heap.capacity() {
            self.heap.reserve(self.heap.capacity().max(1));
        }
        let (node, id) = self.new_node(deadline, owner);
        self.heap.push(node);
        self.sift_up(self.heap.len() - 1);
        id
    }

    fn remove(&mut self, id: TimerId) -> Option<T> {
        let slot = self.slots.get_mut(id.key())?;
        if slot.generation != id.generation() {
            return None;
        }
        let owner = slot.owner.take()?;
        self.live -= 1;
        Some(owner)
    }

    fn tick<E: Expire<T>>(&mut self, now: Instant, expire: &mut E) -> usize {
        let mut fired = 0;
        while self.peek_deadline().is_some_and(|deadline| deadline <= now) {
            let Some(node) = self.pop_node() else { break };
            if let Some(owner) = self.slots.remove(node.key).owner {
                self.live -= 1;
                expire.expire(owner);
                fired += 1;
            }
        }
        fired
    }

    fn len(&self) -> usize {
        self.live
    }
}
