//! Cooperative timer queue
//!
//! The tour runs on one thread. Deferred work (anchor retries, fake concierge
//! latency) is queued here with a deadline and handed back by
//! [`TimerQueue::drain_due`] from the event loop's tick. Nothing fires on its
//! own, so dropping or clearing the queue cancels everything still pending.

use std::time::{Duration, Instant};

/// Handle for cancelling one scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Entry<T> {
    id: TimerId,
    due: Instant,
    payload: T,
}

#[derive(Debug)]
pub struct TimerQueue<T> {
    next_id: u64,
    entries: Vec<Entry<T>>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    /// Queue `payload` to come due `delay` after `now`
    pub fn schedule(&mut self, now: Instant, delay: Duration, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            due: now + delay,
            payload,
        });
        id
    }

    /// Cancel one timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Cancel every timer whose payload matches
    pub fn cancel_where<F: Fn(&T) -> bool>(&mut self, pred: F) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !pred(&e.payload));
        before - self.entries.len()
    }

    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    /// Remove and return every payload due at `now`, earliest first.
    /// Timers with the same deadline come back in scheduling order.
    pub fn drain_due(&mut self, now: Instant) -> Vec<T> {
        let (mut due, pending): (Vec<_>, Vec<_>) =
            self.entries.drain(..).partition(|e| e.due <= now);
        self.entries = pending;
        due.sort_by(|a, b| a.due.cmp(&b.due).then(a.id.0.cmp(&b.id.0)));
        due.into_iter().map(|e| e.payload).collect()
    }

    /// Earliest pending deadline, for sizing the event loop's poll timeout
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|e| e.due).min()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_drain_due_in_deadline_order() {
        let t0 = Instant::now();
        let mut q = TimerQueue::new();
        q.schedule(t0, ms(300), "late");
        q.schedule(t0, ms(100), "early");
        q.schedule(t0, ms(100), "early-second");

        assert!(q.drain_due(t0 + ms(50)).is_empty());
        assert_eq!(q.drain_due(t0 + ms(150)), vec!["early", "early-second"]);
        assert_eq!(q.len(), 1);
        assert_eq!(q.next_deadline(), Some(t0 + ms(300)));
        assert_eq!(q.drain_due(t0 + ms(300)), vec!["late"]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_cancel() {
        let t0 = Instant::now();
        let mut q = TimerQueue::new();
        let a = q.schedule(t0, ms(10), 1);
        q.schedule(t0, ms(10), 2);
        assert!(q.cancel(a));
        assert!(!q.cancel(a));
        assert_eq!(q.drain_due(t0 + ms(10)), vec![2]);
    }

    #[test]
    fn test_cancel_where_and_all() {
        let t0 = Instant::now();
        let mut q = TimerQueue::new();
        for n in 0..6 {
            q.schedule(t0, ms(n), n);
        }
        assert_eq!(q.cancel_where(|n| n % 2 == 0), 3);
        assert_eq!(q.len(), 3);
        q.cancel_all();
        assert!(q.drain_due(t0 + ms(100)).is_empty());
        assert_eq!(q.next_deadline(), None);
    }
}
