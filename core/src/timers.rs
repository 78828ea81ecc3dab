use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Deadline-ordered queue of deferred tasks.
///
/// Tasks with equal deadlines pop in the order they were scheduled. A
/// scheduled task cannot be revoked. The queue never reads the clock: callers
/// pass `now` in, which lets tests advance time by hand.
#[derive(Debug)]
pub struct Timers<T> {
    next_seq: u64,
    queue: BTreeMap<(Instant, u64), T>,
}

impl<T> Default for Timers<T> {
    fn default() -> Self {
        Self { next_seq: 0, queue: BTreeMap::new() }
    }
}

impl<T> Timers<T> {
    /// Empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` to become due at `at`.
    pub fn schedule(&mut self, at: Instant, task: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.insert((at, seq), task);
    }

    /// Queue `task` to become due `delay` after `now`.
    pub fn schedule_after(&mut self, now: Instant, delay: Duration, task: T) {
        self.schedule(now + delay, task);
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.first_key_value().map(|((at, _), _)| *at)
    }

    /// Remove and return the earliest task if it is due at `now`, with its deadline.
    pub fn pop_due(&mut self, now: Instant) -> Option<(Instant, T)> {
        let ((at, _), _) = self.queue.first_key_value()?;
        if *at > now {
            return None;
        }
        self.queue.pop_first().map(|((at, _), task)| (at, task))
    }

    /// Number of pending tasks.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_deadline_then_fifo_order() {
        let t0 = Instant::now();
        let mut timers = Timers::new();
        timers.schedule_after(t0, Duration::from_secs(5), "late");
        timers.schedule_after(t0, Duration::from_secs(1), "first");
        timers.schedule_after(t0, Duration::from_secs(1), "second");

        assert_eq!(timers.next_deadline(), Some(t0 + Duration::from_secs(1)));
        assert!(timers.pop_due(t0).is_none());

        let now = t0 + Duration::from_secs(10);
        let order: Vec<&str> = std::iter::from_fn(|| timers.pop_due(now).map(|(_, t)| t)).collect();
        assert_eq!(order, ["first", "second", "late"]);
        assert!(timers.is_empty());
    }

    #[test]
    fn not_due_before_deadline() {
        let t0 = Instant::now();
        let mut timers = Timers::new();
        timers.schedule_after(t0, Duration::from_millis(300), 1u8);
        assert!(timers.pop_due(t0 + Duration::from_millis(299)).is_none());
        assert_eq!(
            timers.pop_due(t0 + Duration::from_millis(300)),
            Some((t0 + Duration::from_millis(300), 1))
        );
    }
}
