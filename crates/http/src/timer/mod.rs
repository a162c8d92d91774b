//! Deadline stores used to expire idle connections
//!
//! Three interchangeable strategies implement [`TimerStore`]:
//!
//! - [`SortedList`]: entries kept in deadline order, cheap to expire, O(n) to insert
//! - [`TimeWheel`]: hashed wheel of slots with rotation counts, O(1) insert and remove
//! - [`TimeHeap`]: binary min-heap with lazy removal
//!
//! Entries live in a [`slab::Slab`] arena and are addressed by a [`TimerId`]. The id
//! carries a generation, so a stale id whose slot was reused never touches the new entry.
//! Expired owners are handed to an [`Expire`] handler passed to `tick`.

mod heap;
mod list;
mod wheel;

use std::time::Instant;

pub use heap::TimeHeap;
pub use list::SortedList;
pub use wheel::{DEFAULT_SLOTS, TimeWheel};

/// Handle to an entry of a [`TimerStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId {
    key: usize,
    generation: u64,
}

impl TimerId {
    pub(crate) fn new(key: usize, generation: u64) -> Self {
        Self { key, generation }
    }

    pub(crate) fn key(self) -> usize {
        self.key
    }

    pub(crate) fn generation(self) -> u64 {
        self.generation
    }
}

/// Receives the owner of every entry whose deadline has passed.
pub trait Expire<T> {
    fn expire(&mut self, owner: T);
}

impl<T, F: FnMut(T)> Expire<T> for F {
    #[inline]
    fn expire(&mut self, owner: T) {
        self(owner);
    }
}

/// A store of deadlines, each owned by a `T`.
///
/// Every entry is handed to the [`Expire`] handler at most once, and never after
/// it was removed or replaced by [`adjust`](TimerStore::adjust).
pub trait TimerStore<T> {
    /// Adds an entry expiring at `deadline`.
    fn insert(&mut self, deadline: Instant, owner: T) -> TimerId;

    /// Removes an entry and returns its owner, or `None` if it already fired or was removed.
    fn remove(&mut self, id: TimerId) -> Option<T>;

    /// Moves an entry to a new deadline and returns the id that replaces `id`.
    fn adjust(&mut self, id: TimerId, deadline: Instant) -> Option<TimerId> {
        let owner = self.remove(id)?;
        Some(self.insert(deadline, owner))
    }

    /// Fires every entry that is due at `now` and returns how many fired.
    fn tick<E: Expire<T>>(&mut self, now: Instant, expire: &mut E) -> usize;

    /// Number of live entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One of the timer strategies, picked at startup.
#[derive(Debug)]
pub enum Timers<T> {
    List(SortedList<T>),
    Wheel(TimeWheel<T>),
    Heap(TimeHeap<T>),
}

impl<T> TimerStore<T> for Timers<T> {
    fn insert(&mut self, deadline: Instant, owner: T) -> TimerId {
        match self {
            Self::List(list) => list.insert(deadline, owner),
            Self::Wheel(wheel) => wheel.insert(deadline, owner),
            Self::Heap(heap) => heap.insert(deadline, owner),
        }
    }

    fn remove(&mut self, id: TimerId) -> Option<T> {
        match self {
            Self::List(list) => list.remove(id),
            Self::Wheel(wheel) => wheel.remove(id),
            Self::Heap(heap) => heap.remove(id),
        }
    }

    fn adjust(&mut self, id: TimerId, deadline: Instant) -> Option<TimerId> {
        match self {
            Self::List(list) => list.adjust(id, deadline),
            Self::Wheel(wheel) => wheel.adjust(id, deadline),
            Self::Heap(heap) => heap.adjust(id, deadline),
        }
    }

    fn tick<E: Expire<T>>(&mut self, now: Instant, expire: &mut E) -> usize {
        match self {
            Self::List(list) => list.tick(now, expire),
            Self::Wheel(wheel) => wheel.tick(now, expire),
            Self::Heap(heap) => heap.tick(now, expire),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::List(list) => list.len(),
            Self::Wheel(wheel) => wheel.len(),
            Self::Heap(heap) => heap.len(),
        }
    }
}
