//! Builder API for ergonomic breaker configuration

use crate::{
    Counts, State,
    breaker::{Breaker, Settings},
    clock::Clock,
};
use std::sync::Arc;
use std::time::Duration;

/// Builder for creating breakers with a fluent API
#[derive(Debug)]
pub struct BreakerBuilder {
    settings: Settings,
}

impl BreakerBuilder {
    /// Create a new builder for a breaker with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            settings: Settings {
                name: name.into(),
                ..Settings::default()
            },
        }
    }

    /// Set the number of probe calls allowed while half-open
    ///
    /// The same number of consecutive probe successes closes the breaker.
    pub fn max_requests(mut self, max_requests: u32) -> Self {
        self.settings.max_requests = max_requests;
        self
    }

    /// Set the period after which a closed breaker clears its counts
    pub fn interval(mut self, interval: Duration) -> Self {
        self.settings.interval = interval;
        self
    }

    /// Set how long the breaker stays open before probing
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = timeout;
        self
    }

    /// Set the predicate that decides when a closed breaker opens
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tripwire::Breaker;
    ///
    /// let breaker = Breaker::builder("search")
    ///     .ready_to_trip(|counts| counts.requests >= 10 && counts.failures * 2 >= counts.requests)
    ///     .build();
    /// ```
    pub fn ready_to_trip<F>(mut self, f: F) -> Self
    where
        F: Fn(&Counts) -> bool + Send + Sync + 'static,
    {
        self.settings.ready_to_trip = Some(Arc::new(f));
        self
    }

    /// Set callback for state changes, called with `(name, from, to)`
    ///
    /// The callback runs while the breaker's lock is held and must not call
    /// back into the same breaker.
    pub fn on_state_change<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, State, State) + Send + Sync + 'static,
    {
        self.settings.on_state_change = Some(Arc::new(f));
        self
    }

    /// Set a custom time source
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.settings.clock = Some(clock);
        self
    }

    /// Build the breaker
    pub fn build(self) -> Breaker {
        Breaker::new(self.settings)
    }
}
