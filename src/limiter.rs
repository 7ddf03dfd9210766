use std::time::{Duration, Instant};

/// Length of one quota window.
pub const WINDOW: Duration = Duration::from_secs(5 * 60);

/// Calls allowed per window.
pub const CALLS_PER_WINDOW: u32 = 300;

/// Rolling call budget for the Core LMI API.
///
/// The tracker is advisory: [`QuotaWindow::recommended_delay`] returns how
/// long to wait before the next call so that evenly spaced calls never run
/// out of budget before the window resets. Nothing stops a caller that
/// ignores it.
#[derive(Debug, Clone)]
pub struct QuotaWindow {
    start: Instant,
    expiration: Instant,
    upper_bound: u32,
    remaining: u32,
}

impl Default for QuotaWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl QuotaWindow {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            start,
            expiration: start + WINDOW,
            upper_bound: CALLS_PER_WINDOW,
            remaining: CALLS_PER_WINDOW,
        }
    }

    /// A window ending at `expiration` with `remaining` calls left, for
    /// carrying a budget over from an earlier client.
    pub fn resuming(expiration: Instant, remaining: u32) -> Self {
        Self {
            start: expiration.checked_sub(WINDOW).unwrap_or(expiration),
            expiration,
            upper_bound: CALLS_PER_WINDOW,
            remaining: remaining.min(CALLS_PER_WINDOW),
        }
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    pub fn expiration(&self) -> Instant {
        self.expiration
    }

    pub fn upper_bound(&self) -> u32 {
        self.upper_bound
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Records one dispatched call.
    pub fn consume(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    pub fn recommended_delay(&mut self) -> Duration {
        self.recommended_delay_at(Instant::now())
    }

    /// Same as [`QuotaWindow::recommended_delay`] with an explicit clock read.
    ///
    /// An expired window is replaced by a fresh one starting at `now`, with
    /// the budget restored to the upper bound.
    pub fn recommended_delay_at(&mut self, now: Instant) -> Duration {
        let mut seconds_left = self.expiration.saturating_duration_since(now);
        if seconds_left.is_zero() {
            log::debug!(
                "quota window expired with {} call(s) unused; starting a new window",
                self.remaining
            );
            *self = Self::starting_at(now);
            seconds_left = WINDOW;
        }

        if self.remaining == 0 {
            return seconds_left;
        }

        seconds_left / self.remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_window_spreads_calls_evenly() {
        let t0 = Instant::now();
        let mut q = QuotaWindow::starting_at(t0);
        assert_eq!(q.remaining(), 300);
        assert_eq!(q.expiration() - q.start(), WINDOW);
        // 300s / 300 calls
        assert_eq!(q.recommended_delay_at(t0), Duration::from_secs(1));
    }

    #[test]
    fn delay_divides_time_left_by_remaining_budget() {
        let t0 = Instant::now();
        let mut q = QuotaWindow::starting_at(t0);
        for _ in 0..200 {
            q.consume();
        }
        let delay = q.recommended_delay_at(t0 + Duration::from_secs(100));
        assert_eq!(delay, Duration::from_secs(2));
    }

    #[test]
    fn exhausted_budget_waits_out_the_window() {
        let t0 = Instant::now();
        let mut q = QuotaWindow::starting_at(t0);
        for _ in 0..CALLS_PER_WINDOW {
            q.consume();
        }
        assert_eq!(q.remaining(), 0);
        let delay = q.recommended_delay_at(t0 + Duration::from_secs(60));
        assert_eq!(delay, Duration::from_secs(240));
    }

    #[test]
    fn resumed_window_keeps_its_budget_until_it_expires() {
        let t0 = Instant::now();
        let mut q = QuotaWindow::resuming(t0 + Duration::from_secs(10), 5);
        assert_eq!(q.remaining(), 5);
        assert_eq!(q.recommended_delay_at(t0), Duration::from_secs(2));

        let mut q = QuotaWindow::resuming(t0, 0);
        assert_eq!(q.recommended_delay_at(t0), Duration::from_secs(1));
        assert_eq!(q.remaining(), CALLS_PER_WINDOW);

        assert_eq!(QuotaWindow::resuming(t0, 1000).remaining(), CALLS_PER_WINDOW);
    }

    #[test]
    fn consume_saturates_at_zero() {
        let mut q = QuotaWindow::new();
        for _ in 0..CALLS_PER_WINDOW + 5 {
            q.consume();
        }
        assert_eq!(q.remaining(), 0);
    }

    #[test]
    fn expired_window_resets_and_restores_budget() {
        let t0 = Instant::now();
        let mut q = QuotaWindow::starting_at(t0);
        for _ in 0..CALLS_PER_WINDOW {
            q.consume();
        }

        let later = t0 + WINDOW + Duration::from_secs(3);
        let delay = q.recommended_delay_at(later);

        assert_eq!(q.start(), later);
        assert_eq!(q.expiration(), later + WINDOW);
        assert_eq!(q.remaining(), CALLS_PER_WINDOW);
        assert_eq!(delay, Duration::from_secs(1));
    }

    #[test]
    fn delay_is_never_negative_at_the_boundary() {
        let t0 = Instant::now();
        let mut q = QuotaWindow::starting_at(t0);
        let delay = q.recommended_delay_at(t0 + WINDOW);
        assert!(delay <= Duration::from_secs(1));
        assert_eq!(q.remaining(), CALLS_PER_WINDOW);
    }
}
