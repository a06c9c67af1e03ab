//! Repeating wall-clock deadlines for the driver's five timers. Distinct from a priority-ordered
//! event queue — each [`Ticker`] tracks exactly one period and is polled once per driver
//! iteration rather than scheduling arbitrary future callbacks.

use std::time::{Duration, Instant};

/// A single repeating deadline.
#[derive(Copy, Clone, Debug)]
pub struct Ticker {
    period: Duration,
    deadline: Instant,
}

impl Ticker {
    #[must_use]
    pub fn new(period: Duration, now: Instant) -> Self {
        Self { period, deadline: now + period }
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Fires at most once per call: `true` if `now` has reached the deadline, in which case the
    /// deadline advances by exactly one period (any additional backlog is dropped, not queued).
    /// Used by the leaderboard/debug/cloud/bots timers, none of which need catch-up ticks.
    pub fn poll_once(&mut self, now: Instant) -> bool {
        if now < self.deadline {
            return false;
        }
        self.deadline += self.period;
        // a very long stall (e.g. a debugger pause) should not leave this ticker forever "due";
        // resync to the next deadline strictly after `now`.
        if now >= self.deadline {
            let behind = now.duration_since(self.deadline).as_secs_f64();
            let periods = (behind / self.period.as_secs_f64()).floor() as u32 + 1;
            self.deadline += self.period * periods;
        }
        true
    }

    /// The update timer's catch-up variant: fires only once `now` is more than `tolerance`
    /// (a fraction of one period) past the deadline, and reports `1 + skipped` ticks to
    /// simulate, with `skipped` capped at `max_catch_up` so sustained overload cannot make a
    /// single call demand unbounded work. Returns `None` if the deadline has not yet arrived.
    pub fn poll_catch_up(&mut self, now: Instant, tolerance: f64, max_catch_up: u32) -> Option<u32> {
        if now < self.deadline {
            return None;
        }
        let late = now.duration_since(self.deadline).as_secs_f64();
        let period_secs = self.period.as_secs_f64();
        let skipped = if late > tolerance * period_secs {
            ((late / period_secs).floor() as u32).min(max_catch_up)
        } else {
            0
        };
        let ticks = 1 + skipped;
        self.deadline += self.period * ticks;
        Some(ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_once_fires_exactly_at_deadline() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_millis(100), start);
        assert!(!ticker.poll_once(start));
        assert!(ticker.poll_once(start + Duration::from_millis(100)));
    }

    #[test]
    fn catch_up_reports_no_skips_when_on_time() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_millis(100), start);
        let ticks = ticker.poll_catch_up(start + Duration::from_millis(100), 0.1, 4).unwrap();
        assert_eq!(ticks, 1);
    }

    #[test]
    fn catch_up_caps_skipped_ticks() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_millis(100), start);
        let ticks = ticker.poll_catch_up(start + Duration::from_millis(2_000), 0.1, 4).unwrap();
        assert_eq!(ticks, 5); // 1 + min(skipped, 4)
    }

    #[test]
    fn catch_up_within_tolerance_does_not_skip() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_millis(100), start);
        // 5ms late is within the 10% (10ms) tolerance band.
        let ticks = ticker.poll_catch_up(start + Duration::from_millis(105), 0.1, 4).unwrap();
        assert_eq!(ticks, 1);
    }
}
