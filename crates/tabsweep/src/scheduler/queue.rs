//! Deadline queue for tracked timers.
//!
//! A min-heap of `(deadline, generation, key)`. Re-arming or cancelling a
//! timer never searches the heap: the old entry simply stops matching the
//! tracked timer and is discarded when it surfaces. Ties on the deadline
//! pop in arm order (lower generation first).

use crate::identity::TabKey;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct QueueEntry {
    pub deadline: Instant,
    pub generation: u64,
    pub key: TabKey,
}

#[derive(Debug, Clone, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Reverse<QueueEntry>>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, deadline: Instant, generation: u64, key: TabKey) {
        self.heap.push(Reverse(QueueEntry {
            deadline,
            generation,
            key,
        }));
    }

    pub fn peek(&self) -> Option<&QueueEntry> {
        self.heap.peek().map(|Reverse(entry)| entry)
    }

    /// Pop the earliest entry if it is due at `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<QueueEntry> {
        if self.peek()?.deadline > now {
            return None;
        }
        self.heap.pop().map(|Reverse(entry)| entry)
    }

    /// Drop stale entries from the front until the earliest one is live.
    pub fn discard_stale(&mut self, is_live: impl Fn(&QueueEntry) -> bool) {
        while let Some(entry) = self.peek() {
            if is_live(entry) {
                break;
            }
            self.heap.pop();
        }
    }

    /// Rebuild from live entries only.
    pub fn compact(&mut self, is_live: impl Fn(&QueueEntry) -> bool) {
        let heap = std::mem::take(&mut self.heap);
        self.heap = heap
            .into_iter()
            .filter(|Reverse(entry)| is_live(entry))
            .collect();
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Entries in the heap, stale ones included.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::KeyKind;
    use std::time::Duration;

    const SEC: Duration = Duration::from_secs(1);

    fn key(label: &str) -> TabKey {
        TabKey {
            column: 1,
            kind: KeyKind::Label(label.into()),
        }
    }

    #[test]
    fn pops_by_deadline_then_generation() {
        let t0 = Instant::now();
        let mut queue = TimerQueue::new();
        queue.push(t0 + 2 * SEC, 1, key("late"));
        queue.push(t0 + SEC, 3, key("second"));
        queue.push(t0 + SEC, 2, key("first"));

        assert!(queue.pop_due(t0).is_none());
        let order: Vec<String> = std::iter::from_fn(|| queue.pop_due(t0 + 2 * SEC))
            .map(|e| e.key.to_string())
            .collect();
        assert_eq!(order, vec!["[1]:first", "[1]:second", "[1]:late"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn stale_entries_are_skipped() {
        let t0 = Instant::now();
        let mut queue = TimerQueue::new();
        // Re-armed at generation 2; the generation 1 entry is stale.
        queue.push(t0 + SEC, 1, key("a"));
        queue.push(t0 + 5 * SEC, 2, key("a"));
        queue.push(t0 + 3 * SEC, 3, key("b"));

        let live = |e: &QueueEntry| e.generation != 1;
        queue.discard_stale(live);
        assert_eq!(queue.peek().unwrap().deadline, t0 + 3 * SEC);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn compact_keeps_live_entries() {
        let t0 = Instant::now();
        let mut queue = TimerQueue::new();
        for generation in 1..=10 {
            queue.push(t0 + SEC * generation as u32, generation, key("a"));
        }
        queue.compact(|e| e.generation == 10);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.peek().unwrap().generation, 10);
    }
}
