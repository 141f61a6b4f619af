//! Deferred steps
//!
//! Some transitions need a pause before their second half, e.g. giving an
//! engine time to act on a cancel before new speech starts. Steps are
//! stored with their due time and run from the event loop; nothing here
//! spawns threads or sleeps.

use log::trace;
use std::fmt::Debug;
use std::time::{Duration, Instant};

/// Queue of actions waiting for their due time
#[derive(Debug)]
pub struct Scheduler<T> {
    pending: Vec<(Instant, T)>,
}

impl<T: Debug> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Run `action` once `delay` has passed since `now`
    pub fn schedule(&mut self, now: Instant, delay: Duration, action: T) {
        trace!("Scheduling {:?} in {:?}", action, delay);
        self.pending.push((now + delay, action));
    }

    /// Drop every pending action
    pub fn clear(&mut self) {
        if !self.pending.is_empty() {
            trace!("Dropping {} scheduled actions", self.pending.len());
        }
        self.pending.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Remove and return the earliest action that is due at `now`
    ///
    /// Taking one at a time lets a running action clear the rest.
    pub fn pop_due(&mut self, now: Instant) -> Option<T> {
        let idx = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, (when, _))| *when <= now)
            .min_by_key(|(_, (when, _))| *when)
            .map(|(i, _)| i)?;
        Some(self.pending.remove(idx).1)
    }

    /// Time until the next action is due
    ///
    /// Returns None if nothing is scheduled. Used to size the event loop's
    /// poll timeout.
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.pending
            .iter()
            .map(|(when, _)| *when)
            .min()
            .map(|next| next.saturating_duration_since(now))
    }
}

impl<T: Debug> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_due_before_time() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.schedule(t0, Duration::from_millis(200), "restart");

        assert_eq!(scheduler.pop_due(t0 + Duration::from_millis(199)), None);
        assert_eq!(scheduler.pop_due(t0 + Duration::from_millis(200)), Some("restart"));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_pops_earliest_first() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.schedule(t0, Duration::from_millis(300), "late");
        scheduler.schedule(t0, Duration::from_millis(100), "early");

        let later = t0 + Duration::from_secs(1);
        assert_eq!(scheduler.pop_due(later), Some("early"));
        assert_eq!(scheduler.pop_due(later), Some("late"));
        assert_eq!(scheduler.pop_due(later), None);
    }

    #[test]
    fn test_time_until_next() {
        let t0 = Instant::now();
        let mut scheduler: Scheduler<u8> = Scheduler::new();
        assert_eq!(scheduler.time_until_next(t0), None);

        scheduler.schedule(t0, Duration::from_millis(200), 1);
        scheduler.schedule(t0, Duration::from_millis(50), 2);
        assert_eq!(scheduler.time_until_next(t0), Some(Duration::from_millis(50)));
        assert_eq!(
            scheduler.time_until_next(t0 + Duration::from_secs(1)),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_clear() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.schedule(t0, Duration::ZERO, 'a');
        scheduler.schedule(t0, Duration::ZERO, 'b');
        assert_eq!(scheduler.len(), 2);

        scheduler.clear();
        assert_eq!(scheduler.pop_due(t0), None);
    }
}
