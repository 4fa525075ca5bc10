//! Virtual-clock timer queue.
//!
//! The queue does not use internal threads. The owner advances time with
//! [`TimerQueue::pop_due`] and runs each returned task itself, so every timer
//! fire is a plain synchronous call on the owner.
//!
//! ## Ordering
//!
//! Timers fire in due-time order; timers due at the same instant fire in the
//! order they were scheduled.
//!
//! ## Cancellation
//!
//! [`TimerQueue::schedule`] returns a [`TimerHandle`]. Once
//! [`TimerQueue::cancel`] has been called with that handle the task is gone
//! from the queue and can never be returned by `pop_due`.

mod driver;

pub use driver::drive;

use std::collections::{BTreeMap, HashMap};

/// Cancellation handle for a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

/// Queue of delayed tasks keyed by virtual due time.
#[derive(Debug)]
pub struct TimerQueue<T> {
    now_ms: u64,
    next_id: u64,
    entries: BTreeMap<(u64, u64), T>,
    /// handle id -> due time, for O(log n) cancellation.
    due_by_id: HashMap<u64, u64>,
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            next_id: 0,
            entries: BTreeMap::new(),
            due_by_id: HashMap::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Current virtual time in milliseconds since the queue was created.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the timer behind `handle` is still pending.
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.due_by_id.contains_key(&handle.0)
    }

    /// Due time of the earliest pending timer.
    pub fn next_due_ms(&self) -> Option<u64> {
        self.entries.keys().next().map(|(due, _)| *due)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Schedule `task` to fire `delay_ms` after the current virtual time.
    pub fn schedule(&mut self, delay_ms: u64, task: T) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        let due = self.now_ms.saturating_add(delay_ms);
        self.entries.insert((due, id), task);
        self.due_by_id.insert(id, due);
        TimerHandle(id)
    }

    /// Cancel a pending timer. Returns the task if it had not fired yet.
    pub fn cancel(&mut self, handle: TimerHandle) -> Option<T> {
        let due = self.due_by_id.remove(&handle.0)?;
        self.entries.remove(&(due, handle.0))
    }

    /// Remove the earliest timer due at or before `until_ms`, moving the
    /// virtual clock to its due time.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<(TimerHandle, T)> {
        let (&(due, id), _) = self.entries.iter().next()?;
        if due > until_ms {
            return None;
        }
        let task = self.entries.remove(&(due, id))?;
        self.due_by_id.remove(&id);
        self.now_ms = self.now_ms.max(due);
        Some((TimerHandle(id), task))
    }

    /// Move the virtual clock forward without firing anything.
    ///
    /// Callers drain [`pop_due`](Self::pop_due) first; the clock never moves
    /// backwards.
    pub fn set_now(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    /// Drop every pending timer. Returns how many were cancelled.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.due_by_id.clear();
        count
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
