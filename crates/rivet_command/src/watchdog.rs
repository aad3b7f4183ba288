//! Loop-overrun detection for the scheduler cycle.

use core::fmt::Write as _;
use std::time::{Duration, Instant};

use crate::clock::Clock;

/// Times one scheduler cycle against a budget and reports overruns.
///
/// The scheduler marks an epoch after each phase of the cycle. When the cycle
/// exceeds its budget the epochs are logged, which points at the subsystem or
/// command that ate the period.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::time::{Duration, Instant};
/// use rivet_command::clock::{Clock, MockClock};
/// use rivet_command::watchdog::Watchdog;
///
/// let mock = Arc::new(MockClock::new(Instant::now()));
/// let mut watchdog = Watchdog::new(Duration::from_millis(20), Clock::with_provider(mock.clone()));
///
/// watchdog.reset();
/// mock.advance(Duration::from_millis(25));
/// watchdog.add_epoch("Drive.periodic()");
///
/// assert!(watchdog.check("CommandScheduler"));
/// assert_eq!(watchdog.overrun_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Watchdog {
    timeout: Duration,
    clock: Clock,
    start: Instant,
    last_epoch: Instant,
    epochs: Vec<(String, Duration)>,
    overruns: u64,
}

impl Watchdog {
    /// Creates a watchdog with the given cycle budget.
    #[must_use]
    pub fn new(timeout: Duration, clock: Clock) -> Self {
        let now = clock.now();
        Self {
            timeout,
            clock,
            start: now,
            last_epoch: now,
            epochs: Vec::new(),
            overruns: 0,
        }
    }

    /// Returns the cycle budget.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Changes the cycle budget.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Starts timing a new cycle and forgets the previous cycle's epochs.
    pub fn reset(&mut self) {
        let now = self.clock.now();
        self.start = now;
        self.last_epoch = now;
        self.epochs.clear();
    }

    /// Records the time spent since the previous epoch under `name`.
    pub fn add_epoch(&mut self, name: impl Into<String>) {
        let now = self.clock.now();
        self.epochs
            .push((name.into(), now.saturating_duration_since(self.last_epoch)));
        self.last_epoch = now;
    }

    /// Returns the time spent in the current cycle.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed_since(self.start)
    }

    /// Returns `true` if the current cycle exceeded its budget.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.elapsed() > self.timeout
    }

    /// Returns the epochs recorded in the current cycle.
    #[must_use]
    pub fn epochs(&self) -> &[(String, Duration)] {
        &self.epochs
    }

    /// Returns how many cycles overran since creation.
    #[must_use]
    pub fn overrun_count(&self) -> u64 {
        self.overruns
    }

    /// Ends the current cycle, logging an overrun for `owner` if it expired.
    ///
    /// Returns `true` on overrun.
    pub fn check(&mut self, owner: &str) -> bool {
        if !self.is_expired() {
            return false;
        }
        self.overruns += 1;
        tracing::warn!(
            elapsed = ?self.elapsed(),
            budget = ?self.timeout,
            epochs = %self.format_epochs(),
            "{owner} loop overrun"
        );
        true
    }

    fn format_epochs(&self) -> String {
        let mut out = String::new();
        for (name, duration) in &self.epochs {
            let _ = write!(out, "\n\t{name}: {:.6}s", duration.as_secs_f64());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use std::sync::Arc;

    fn mock_watchdog(budget_ms: u64) -> (Arc<MockClock>, Watchdog) {
        let mock = Arc::new(MockClock::new(Instant::now()));
        let watchdog = Watchdog::new(
            Duration::from_millis(budget_ms),
            Clock::with_provider(mock.clone()),
        );
        (mock, watchdog)
    }

    #[test]
    fn within_budget_is_not_an_overrun() {
        let (mock, mut watchdog) = mock_watchdog(20);
        watchdog.reset();
        mock.advance(Duration::from_millis(20));
        assert!(!watchdog.check("CommandScheduler"));
        assert_eq!(watchdog.overrun_count(), 0);
    }

    #[test]
    fn epochs_measure_deltas() {
        let (mock, mut watchdog) = mock_watchdog(20);
        watchdog.reset();
        mock.advance(Duration::from_millis(3));
        watchdog.add_epoch("Arm.periodic()");
        mock.advance(Duration::from_millis(5));
        watchdog.add_epoch("Drive.execute()");

        assert_eq!(
            watchdog.epochs(),
            [
                ("Arm.periodic()".to_owned(), Duration::from_millis(3)),
                ("Drive.execute()".to_owned(), Duration::from_millis(5)),
            ]
        );
        assert!(watchdog.format_epochs().contains("Drive.execute(): 0.005000s"));
    }

    #[test]
    fn reset_clears_epochs() {
        let (mock, mut watchdog) = mock_watchdog(1);
        mock.advance(Duration::from_millis(2));
        watchdog.add_epoch("stale");
        assert!(watchdog.check("CommandScheduler"));

        watchdog.reset();
        assert!(watchdog.epochs().is_empty());
        assert!(!watchdog.is_expired());
        assert_eq!(watchdog.overrun_count(), 1);
    }
}
