//! Time sources for breaker deadlines
//!
//! This module provides two clocks:
//! - `MonotonicClock`: the system monotonic clock, immune to NTP adjustments
//! - `ManualClock`: a clock that only moves when told to, for deterministic tests

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Abstract monotonic time source used to compute and check deadlines
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current instant
    fn now(&self) -> Instant;
}

/// Clock backed by [`Instant::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that stands still until [`advance`](ManualClock::advance) is called
///
/// Useful for:
/// - Testing timeout and interval transitions without sleeping
/// - Replaying a failure scenario step by step
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tripwire::{Breaker, ManualClock, State};
///
/// let clock = Arc::new(ManualClock::new());
/// let breaker = Breaker::builder("inventory")
///     .timeout(Duration::from_secs(10))
///     .ready_to_trip(|counts| counts.consecutive_failures >= 1)
///     .clock(clock.clone())
///     .build();
///
/// let _ = breaker.execute(|| Err::<(), _>("down"));
/// assert_eq!(breaker.state(), State::Open);
///
/// clock.advance(Duration::from_secs(11));
/// assert_eq!(breaker.state(), State::HalfOpen);
/// ```
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock();
        *offset = offset.saturating_add(by);
    }

    /// Total time the clock has been advanced since creation
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock();
        self.origin.checked_add(offset).unwrap_or(self.origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_moves_forward() {
        let clock = MonotonicClock;

        let time1 = clock.now();
        std::thread::sleep(Duration::from_millis(10));
        let time2 = clock.now();

        assert!(time2 > time1);
    }

    #[test]
    fn test_manual_clock_stands_still() {
        let clock = ManualClock::new();

        let time1 = clock.now();
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(clock.now(), time1);
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new();
        let start = clock.now();

        clock.advance(Duration::from_millis(250));
        clock.advance(Duration::from_millis(750));

        assert_eq!(clock.now() - start, Duration::from_secs(1));
        assert_eq!(clock.elapsed(), Duration::from_secs(1));
    }
}
