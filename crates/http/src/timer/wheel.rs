use std::time::{Duration, Instant};

use slab::Slab;

use crate::timer::{Expire, TimerId, TimerStore};

/// Number of slots of a wheel built with [`TimeWheel::with_defaults`].
pub const DEFAULT_SLOTS: usize = 60;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct Entry<T> {
    owner: T,
    generation: u64,
    slot: usize,
    rotation: usize,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Hashed timing wheel.
///
/// The wheel has a fixed number of slots, each covering one `interval`. An entry
/// due `t` intervals from the wheel's current time sits in slot `(current + t) % slots`
/// with a rotation count of `(t - 1) / slots`: the wheel moves to the next slot
/// before scanning it, so an entry is first visited after `t % slots` advances and
/// then once more per full turn. A visit decrements the rotation count and fires
/// the entry when it is already zero.
///
/// Deadlines are rounded up to whole intervals and an entry always waits at least
/// one interval.
#[derive(Debug)]
pub struct TimeWheel<T> {
    entries: Slab<Entry<T>>,
    slots: Box<[Option<usize>]>,
    interval: Duration,
    current: usize,
    wheel_now: Instant,
    generation: u64,
}

impl<T> TimeWheel<T> {
    /// Creates a wheel of `slots` slots of `interval` each, starting at `start`.
    ///
    /// # Panics
    ///
    /// Panics if `slots` is zero or `interval` is zero.
    pub fn new(slots: usize, interval: Duration, start: Instant) -> Self {
        assert!(slots > 0, "a time wheel needs at least one slot");
        assert!(!interval.is_zero(), "a time wheel needs a nonzero interval");
        Self {
            entries: Slab::new(),
            slots: vec![None; slots].into_boxed_slice(),
            interval,
            current: 0,
            wheel_now: start,
            generation: 0,
        }
    }

    /// A wheel of 60 one-second slots.
    pub fn with_defaults(start: Instant) -> Self {
        Self::new(DEFAULT_SLOTS, DEFAULT_INTERVAL, start)
    }

    /// The instant the current slot stands for.
    pub fn wheel_now(&self) -> Instant {
        self.wheel_now
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of whole intervals until `deadline` fires, at least one.
    fn ticks_until(&self, deadline: Instant) -> usize {
        let delta = deadline.saturating_duration_since(self.wheel_now).as_nanos();
        let ticks = delta.div_ceil(self.interval.as_nanos()).max(1);
        usize::try_from(ticks).unwrap_or(usize::MAX)
    }

    fn unlink(&mut self, key: usize) -> Entry<T> {
        let entry = self.entries.remove(key);
        match entry.prev {
            Some(prev) => self.entries[prev].next = entry.next,
            None => self.slots[entry.slot] = entry.next,
        }
        if let Some(next) = entry.next {
            self.entries[next].prev = entry.prev;
        }
        entry
    }

    /// Visits every entry of the current slot.
    fn expire_slot<E: Expire<T>>(&mut self, expire: &mut E) -> usize {
        let mut fired = 0;
        let mut cursor = self.slots[self.current];
        while let Some(key) = cursor {
            let entry = &mut self.entries[key];
            cursor = entry.next;
            if entry.rotation > 0 {
                entry.rotation -= 1;
                continue;
            }
            expire.expire(self.unlink(key).owner);
            fired += 1;
        }
        fired
    }
}

impl<T> TimerStore<T> for TimeWheel<T> {
    fn insert(&mut self, deadline: Instant, owner: T) -> TimerId {
        let ticks = self.ticks_until(deadline);
        let slot_count = self.slots.len();
        let slot = (self.current + ticks % slot_count) % slot_count;
        let rotation = (ticks - 1) / slot_count;

        self.generation += 1;
        let next = self.slots[slot];
        let key = self.entries.insert(Entry { owner, generation: self.generation, slot, rotation, prev: None, next });
        if let Some(next) = next {
            self.entries[next].prev = Some(key);
        }
        self.slots[slot] = Some(key);
        TimerId::new(key, self.generation)
    }

    fn remove(&mut self, id: TimerId) -> Option<T> {
        let entry = self.entries.get(id.key())?;
        if entry.generation != id.generation() {
            return None;
        }
        Some(self.unlink(id.key()).owner)
    }

    /// Advances one slot per whole interval elapsed since the wheel's current time.
    fn tick<E: Expire<T>>(&mut self, now: Instant, expire: &mut E) -> usize {
        let mut fired = 0;
        while self.wheel_now + self.interval <= now {
            self.current = (self.current + 1) % self.slots.len();
            self.wheel_now += self.interval;
            fired += self.expire_slot(expire);
        }
        fired
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_delays_entries_beyond_one_turn() {
        let start = Instant::now();
        let mut wheel = TimeWheel::new(4, Duration::from_secs(1), start);
        wheel.insert(start + Duration::from_secs(2), "short");
        wheel.insert(start + Duration::from_secs(6), "long");
        wheel.insert(start + Duration::from_secs(4), "turn");

        let mut fired = Vec::new();
        for second in 1..=8 {
            wheel.tick(start + Duration::from_secs(second), &mut |owner| fired.push((second, owner)));
        }
        assert_eq!(fired, [(2, "short"), (4, "turn"), (6, "long")]);
    }

    #[test]
    fn deadlines_round_up_to_whole_intervals() {
        let start = Instant::now();
        let mut wheel = TimeWheel::new(60, Duration::from_secs(1), start);
        wheel.insert(start + Duration::from_millis(1500), 1);
        wheel.insert(start, 2);

        let mut fired = Vec::new();
        wheel.tick(start + Duration::from_secs(1), &mut |owner| fired.push(owner));
        assert_eq!(fired, [2]);
        wheel.tick(start + Duration::from_secs(2), &mut |owner| fired.push(owner));
        assert_eq!(fired, [2, 1]);
    }

    #[test]
    fn late_tick_catches_up_slot_by_slot() {
        let start = Instant::now();
        let mut wheel = TimeWheel::with_defaults(start);
        for secs in [1, 30, 59, 61, 130] {
            wheel.insert(start + Duration::from_secs(secs), secs);
        }

        let mut fired = Vec::new();
        assert_eq!(wheel.tick(start + Duration::from_secs(100), &mut |owner| fired.push(owner)), 4);
        assert_eq!(fired, [1, 30, 59, 61]);
        assert_eq!(wheel.wheel_now(), start + Duration::from_secs(100));
        assert_eq!(wheel.len(), 1);
    }

    #[test]
    fn partial_interval_does_not_advance() {
        let start = Instant::now();
        let mut wheel = TimeWheel::new(8, Duration::from_secs(1), start);
        wheel.insert(start + Duration::from_secs(1), ());
        assert_eq!(wheel.tick(start + Duration::from_millis(999), &mut |()| {}), 0);
        assert_eq!(wheel.wheel_now(), start);
        assert_eq!(wheel.tick(start + Duration::from_secs(1), &mut |()| {}), 1);
    }
}
