//! Outcome accounting for a single breaker epoch

/// Request and outcome statistics for the current epoch
///
/// A breaker hands out copies of its counts (to the trip predicate and through
/// [`Breaker::counts`](crate::Breaker::counts)); only the breaker itself can
/// mutate them. Every new epoch starts from all zeros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Counts {
    /// Calls admitted during this epoch
    pub requests: u32,
    /// Successful outcomes recorded during this epoch
    pub successes: u32,
    /// Failed outcomes recorded during this epoch
    pub failures: u32,
    /// Successes since the last failure
    pub consecutive_successes: u32,
    /// Failures since the last success
    pub consecutive_failures: u32,
}

impl Counts {
    pub(crate) fn on_request(&mut self) {
        self.requests = self.requests.saturating_add(1);
    }

    pub(crate) fn on_success(&mut self) {
        self.successes = self.successes.saturating_add(1);
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);
        self.consecutive_failures = 0;
    }

    pub(crate) fn on_failure(&mut self) {
        self.failures = self.failures.saturating_add(1);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_successes = 0;
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}
