use std::time::Instant;

use slab::Slab;

use crate::timer::{Expire, TimerId, TimerStore};

#[derive(Debug)]
struct Node<T> {
    deadline: Instant,
    owner: T,
    generation: u64,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Doubly linked list of entries in ascending deadline order.
///
/// Entries with equal deadlines keep their insertion order.
#[derive(Debug)]
pub struct SortedList<T> {
    nodes: Slab<Node<T>>,
    head: Option<usize>,
    tail: Option<usize>,
    generation: u64,
}

impl<T> SortedList<T> {
    pub fn new() -> Self {
        Self { nodes: Slab::new(), head: None, tail: None, generation: 0 }
    }

    /// Deadline of the entry that fires next.
    pub fn peek_deadline(&self) -> Option<Instant> {
        self.head.map(|key| self.nodes[key].deadline)
    }

    fn unlink(&mut self, key: usize) -> Node<T> {
        let node = self.nodes.remove(key);
        match node.prev {
            Some(prev) => self.nodes[prev].next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.nodes[next].prev = node.prev,
            None => self.tail = node.prev,
        }
        node
    }
}

impl<T> Default for SortedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerStore<T> for SortedList<T> {
    fn insert(&mut self, deadline: Instant, owner: T) -> TimerId {
        let mut next = self.head;
        while let Some(key) = next {
            if self.nodes[key].deadline > deadline {
                break;
            }
            next = self.nodes[key].next;
        }
        let prev = match next {
            Some(key) => self.nodes[key].prev,
            None => self.tail,
        };

        self.generation += 1;
        let key = self.nodes.insert(Node { deadline, owner, generation: self.generation, prev, next });
        match prev {
            Some(prev) => self.nodes[prev].next = Some(key),
            None => self.head = Some(key),
        }
        match next {
            Some(next) => self.nodes[next].prev = Some(key),
            None => self.tail = Some(key),
        }
        TimerId::new(key, self.generation)
    }

    fn remove(&mut self, id: TimerId) -> Option<T> {
        let node = self.nodes.get(id.key())?;
        if node.generation != id.generation() {
            return None;
        }
        Some(self.unlink(id.key()).owner)
    }

    fn tick<E: Expire<T>>(&mut self, now: Instant, expire: &mut E) -> usize {
        let mut fired = 0;
        while let Some(head) = self.head {
            if self.nodes[head].deadline > now {
                break;
            }
            expire.expire(self.unlink(head).owner);
            fired += 1;
        }
        fired
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn keeps_deadline_order() {
        let start = Instant::now();
        let mut list = SortedList::new();
        for (secs, owner) in [(5, "e"), (1, "a"), (3, "c"), (3, "d"), (2, "b")] {
            list.insert(start + Duration::from_secs(secs), owner);
        }
        assert_eq!(list.peek_deadline(), Some(start + Duration::from_secs(1)));

        let mut fired = Vec::new();
        assert_eq!(list.tick(start + Duration::from_secs(3), &mut |owner| fired.push(owner)), 4);
        assert_eq!(fired, ["a", "b", "c", "d"]);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn remove_from_middle_relinks() {
        let start = Instant::now();
        let mut list = SortedList::new();
        let ids: Vec<_> = (1..=3).map(|i| list.insert(start + Duration::from_secs(i), i)).collect();

        assert_eq!(list.remove(ids[1]), Some(2));
        assert_eq!(list.remove(ids[2]), Some(3));
        list.insert(start + Duration::from_secs(4), 4);

        let mut fired = Vec::new();
        list.tick(start + Duration::from_secs(10), &mut |owner| fired.push(owner));
        assert_eq!(fired, [1, 4]);
        assert!(list.is_empty());
        assert_eq!(list.peek_deadline(), None);
    }
}
