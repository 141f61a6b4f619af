//! Wall-clock position tracking
//!
//! Engines do not report progress inside an utterance, so position is
//! derived from the wall clock: `elapsed = now - anchor`, where the anchor is
//! the instant playback would have started had it begun at zero. The anchor
//! is stored as an instant plus a base offset so it never has to be
//! represented before the process epoch.

use std::time::{Duration, Instant};

/// Anchor from which elapsed playback time is derived
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaybackClock {
    anchor: Option<(Instant, f64)>,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position playback at `seconds` as of `now`
    pub fn anchor(&mut self, now: Instant, seconds: f64) {
        self.anchor = Some((now, seconds.max(0.0)));
    }

    pub fn clear(&mut self) {
        self.anchor = None;
    }

    pub fn is_anchored(&self) -> bool {
        self.anchor.is_some()
    }

    /// Elapsed seconds at `now`, capped at `total`
    ///
    /// Returns `None` when the clock is not anchored.
    pub fn elapsed(&self, now: Instant, total: f64) -> Option<f64> {
        self.anchor.map(|(start, base)| {
            let running = now.saturating_duration_since(start).as_secs_f64();
            (base + running).min(total)
        })
    }
}

/// Fixed-period timer that drives position updates while playing
#[derive(Debug, Clone)]
pub struct Sampler {
    period: Duration,
    next_due: Option<Instant>,
}

impl Sampler {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            next_due: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now + self.period);
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Whether a tick is due at `now`; consumes it if so
    ///
    /// Missed ticks collapse into one rather than firing in a burst.
    pub fn take_tick(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                let mut next = due + self.period;
                if next <= now {
                    next = now + self.period;
                }
                self.next_due = Some(next);
                true
            }
            _ => false,
        }
    }

    /// Time until the next tick, if running
    pub fn time_until_tick(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unanchored_clock() {
        let clock = PlaybackClock::new();
        assert!(!clock.is_anchored());
        assert_eq!(clock.elapsed(Instant::now(), 100.0), None);
    }

    #[test]
    fn test_elapsed_from_anchor() {
        let t0 = Instant::now();
        let mut clock = PlaybackClock::new();
        clock.anchor(t0, 30.0);
        assert_eq!(clock.elapsed(t0, 120.0), Some(30.0));
        assert_eq!(clock.elapsed(t0 + Duration::from_millis(2500), 120.0), Some(32.5));
    }

    #[test]
    fn test_elapsed_capped_at_total() {
        let t0 = Instant::now();
        let mut clock = PlaybackClock::new();
        clock.anchor(t0, 110.0);
        assert_eq!(clock.elapsed(t0 + Duration::from_secs(60), 120.0), Some(120.0));
    }

    #[test]
    fn test_elapsed_before_anchor_is_base() {
        let t0 = Instant::now();
        let mut clock = PlaybackClock::new();
        clock.anchor(t0 + Duration::from_secs(1), 5.0);
        assert_eq!(clock.elapsed(t0, 120.0), Some(5.0));
    }

    #[test]
    fn test_sampler_ticks_on_period() {
        let t0 = Instant::now();
        let mut sampler = Sampler::new(Duration::from_millis(100));
        assert!(!sampler.take_tick(t0));

        sampler.start(t0);
        assert!(sampler.is_running());
        assert!(!sampler.take_tick(t0 + Duration::from_millis(50)));
        assert!(sampler.take_tick(t0 + Duration::from_millis(100)));
        assert!(!sampler.take_tick(t0 + Duration::from_millis(150)));
        assert!(sampler.take_tick(t0 + Duration::from_millis(200)));
    }

    #[test]
    fn test_sampler_collapses_missed_ticks() {
        let t0 = Instant::now();
        let mut sampler = Sampler::new(Duration::from_millis(100));
        sampler.start(t0);

        let late = t0 + Duration::from_secs(2);
        assert!(sampler.take_tick(late));
        assert!(!sampler.take_tick(late));
        assert_eq!(sampler.time_until_tick(late), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_stopped_sampler_never_ticks() {
        let t0 = Instant::now();
        let mut sampler = Sampler::new(Duration::from_millis(100));
        sampler.start(t0);
        sampler.stop();
        assert!(!sampler.take_tick(t0 + Duration::from_secs(1)));
        assert_eq!(sampler.time_until_tick(t0), None);
    }
}
