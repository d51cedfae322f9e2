//! Circuit breaker state machine and execution gateway
//!
//! A breaker's mutable data (state tag, epoch, counts and deadline) lives in
//! a single generation record behind one lock. Every admission captures the
//! current epoch; the outcome is only recorded if the epoch is unchanged when
//! the operation returns. Outcomes from an epoch that has since rolled over
//! (window reset, Open/HalfOpen boundary) are dropped instead of polluting the
//! new epoch's counts.

use crate::{
    callbacks::{Callbacks, StateChangeFn, TripPredicate},
    clock::{Clock, MonotonicClock},
    counts::Counts,
    errors::{BreakerError, Rejection},
    state::State,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Timeout used when the configured one is zero
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Half-open probe quota used when the configured one is zero
pub const DEFAULT_MAX_REQUESTS: u32 = 1;

/// The default trip predicate opens once the failure streak exceeds this
pub const DEFAULT_CONSECUTIVE_FAILURES: u32 = 5;

/// Breaker configuration
///
/// Out-of-range values are normalized by [`Breaker::new`], never rejected.
#[derive(Clone)]
pub struct Settings {
    /// Label passed to the state-change callback and attached to log events
    pub name: String,

    /// Probe calls admitted per half-open epoch, and the consecutive
    /// successes needed to close again (0 means 1)
    pub max_requests: u32,

    /// Period after which a closed breaker starts a fresh counting window
    /// (zero means the window never resets)
    pub interval: Duration,

    /// How long the breaker stays open before probing (zero means 60s)
    pub timeout: Duration,

    /// Decides after a closed-state failure whether to open
    /// (default: more than 5 consecutive failures)
    pub ready_to_trip: Option<TripPredicate>,

    /// Called on every state change
    pub on_state_change: Option<StateChangeFn>,

    /// Time source (default: [`MonotonicClock`])
    pub clock: Option<Arc<dyn Clock>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: String::new(),
            max_requests: DEFAULT_MAX_REQUESTS,
            interval: Duration::ZERO,
            timeout: DEFAULT_TIMEOUT,
            ready_to_trip: None,
            on_state_change: None,
            clock: None,
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("name", &self.name)
            .field("max_requests", &self.max_requests)
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .field("ready_to_trip", &self.ready_to_trip.is_some())
            .field("on_state_change", &self.on_state_change.is_some())
            .field("clock", &self.clock)
            .finish()
    }
}

/// Trip predicate used when none is configured
pub fn default_ready_to_trip(counts: &Counts) -> bool {
    counts.consecutive_failures > DEFAULT_CONSECUTIVE_FAILURES
}

/// Opaque identifier of an observation epoch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
struct Epoch(u64);

impl Epoch {
    fn next(self) -> Self {
        Epoch(self.0.wrapping_add(1))
    }
}

/// Everything the lock protects
#[derive(Debug, Default)]
struct Generation {
    state: State,
    epoch: Epoch,
    counts: Counts,
    /// `None` means no time-based exit from the current epoch
    expiry: Option<Instant>,
}

/// Thread-safe circuit breaker
///
/// Share it by reference or through an `Arc`; all methods take `&self`.
pub struct Breaker {
    name: String,
    max_requests: u32,
    interval: Option<Duration>,
    timeout: Duration,
    ready_to_trip: TripPredicate,
    callbacks: Callbacks,
    clock: Arc<dyn Clock>,
    generation: Mutex<Generation>,
}

impl Breaker {
    /// Create a breaker from settings (use [`builder`](Self::builder) for a fluent API)
    pub fn new(settings: Settings) -> Self {
        let Settings {
            name,
            max_requests,
            interval,
            timeout,
            ready_to_trip,
            on_state_change,
            clock,
        } = settings;

        let breaker = Self {
            name,
            max_requests: if max_requests == 0 {
                DEFAULT_MAX_REQUESTS
            } else {
                max_requests
            },
            interval: (!interval.is_zero()).then_some(interval),
            timeout: if timeout.is_zero() {
                DEFAULT_TIMEOUT
            } else {
                timeout
            },
            ready_to_trip: ready_to_trip.unwrap_or_else(|| Arc::new(default_ready_to_trip)),
            callbacks: Callbacks { on_state_change },
            clock: clock.unwrap_or_else(|| Arc::new(MonotonicClock)),
            generation: Mutex::new(Generation::default()),
        };

        {
            let mut generation = breaker.generation.lock();
            let now = breaker.clock.now();
            breaker.new_epoch(&mut generation, now);
        }

        debug!(
            breaker.name = %breaker.name,
            max_requests = breaker.max_requests,
            interval = ?breaker.interval,
            timeout = ?breaker.timeout,
            "breaker created"
        );

        breaker
    }

    /// Create a new breaker builder
    pub fn builder(name: impl Into<String>) -> crate::builder::BreakerBuilder {
        crate::builder::BreakerBuilder::new(name)
    }

    /// Name given at construction
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state, after applying any transition that is due
    ///
    /// This is not a pure read: an open breaker whose timeout has elapsed
    /// moves to half-open here (firing the state-change callback), and a
    /// closed breaker whose interval has elapsed starts a new counting window.
    /// Use [`peek`](Self::peek) for a side-effect-free answer.
    pub fn state(&self) -> State {
        let mut generation = self.generation.lock();
        let now = self.clock.now();
        let (state, _) = self.current_state(&mut generation, now);
        state
    }

    /// The state [`state`](Self::state) would report, without applying anything
    pub fn peek(&self) -> State {
        let generation = self.generation.lock();
        let now = self.clock.now();
        match generation.state {
            State::Open if expired(generation.expiry, now) => State::HalfOpen,
            state => state,
        }
    }

    /// Counts of the current epoch, after applying any transition that is due
    pub fn counts(&self) -> Counts {
        let mut generation = self.generation.lock();
        let now = self.clock.now();
        self.current_state(&mut generation, now);
        generation.counts
    }

    /// Execute a fallible operation with breaker protection
    ///
    /// The operation runs at most once, outside the breaker's lock. Its
    /// result is returned unchanged; an `Err` is wrapped in
    /// [`BreakerError::Operation`] and counts as a failure. A panic inside
    /// the operation is recorded as a failure and then keeps unwinding.
    pub fn execute<T, E, F>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let permit = self.allow()?;

        match operation() {
            Ok(value) => {
                permit.success();
                Ok(value)
            }
            Err(error) => {
                permit.failure();
                Err(BreakerError::Operation(error))
            }
        }
    }

    /// Ask for admission without running anything yet
    ///
    /// On success the returned [`Permit`] must be settled with
    /// [`Permit::success`] or [`Permit::failure`] once the guarded work is
    /// done; dropping it unsettled records a failure.
    pub fn allow(&self) -> Result<Permit<'_>, Rejection> {
        let epoch = self.before_request()?;
        Ok(Permit {
            breaker: self,
            epoch,
            settled: false,
        })
    }

    /// Force the breaker closed and start a fresh epoch
    pub fn reset(&self) {
        let mut generation = self.generation.lock();
        let now = self.clock.now();

        if generation.state == State::Closed {
            self.new_epoch(&mut generation, now);
        } else {
            self.set_state(&mut generation, State::Closed, now);
        }

        info!(breaker.name = %self.name, "breaker reset");
    }

    fn before_request(&self) -> Result<Epoch, Rejection> {
        let mut generation = self.generation.lock();
        let now = self.clock.now();
        let (state, epoch) = self.current_state(&mut generation, now);

        let rejection = match state {
            State::Open => Some(Rejection::Open),
            State::HalfOpen if generation.counts.requests >= self.max_requests => {
                Some(Rejection::TooManyRequests)
            }
            _ => None,
        };

        if let Some(rejection) = rejection {
            debug!(
                breaker.name = %self.name,
                breaker.state = state.as_str(),
                reason = %rejection,
                "call rejected"
            );
            return Err(rejection);
        }

        generation.counts.on_request();
        Ok(epoch)
    }

    fn after_request(&self, before: Epoch, success: bool) {
        let mut generation = self.generation.lock();
        let now = self.clock.now();
        let (state, epoch) = self.current_state(&mut generation, now);

        if epoch != before {
            debug!(
                breaker.name = %self.name,
                success,
                "discarding outcome from a previous epoch"
            );
            return;
        }

        if success {
            self.on_success(&mut generation, state, now);
        } else {
            self.on_failure(&mut generation, state, now);
        }
    }

    fn on_success(&self, generation: &mut Generation, state: State, now: Instant) {
        match state {
            State::Closed => generation.counts.on_success(),
            State::HalfOpen => {
                generation.counts.on_success();
                if generation.counts.consecutive_successes >= self.max_requests {
                    self.set_state(generation, State::Closed, now);
                }
            }
            State::Open => {}
        }
    }

    fn on_failure(&self, generation: &mut Generation, state: State, now: Instant) {
        match state {
            State::Closed => {
                generation.counts.on_failure();
                if (self.ready_to_trip)(&generation.counts) {
                    self.set_state(generation, State::Open, now);
                }
            }
            State::HalfOpen => self.set_state(generation, State::Open, now),
            State::Open => {}
        }
    }

    /// Apply the time-based transition that is due, if any
    fn current_state(&self, generation: &mut Generation, now: Instant) -> (State, Epoch) {
        match generation.state {
            State::Closed => {
                if expired(generation.expiry, now) {
                    trace!(breaker.name = %self.name, "counting window rolled over");
                    self.new_epoch(generation, now);
                }
            }
            State::Open => {
                if expired(generation.expiry, now) {
                    self.set_state(generation, State::HalfOpen, now);
                }
            }
            State::HalfOpen => {}
        }

        (generation.state, generation.epoch)
    }

    fn set_state(&self, generation: &mut Generation, state: State, now: Instant) {
        if generation.state == state {
            return;
        }

        let from = generation.state;
        generation.state = state;
        self.new_epoch(generation, now);

        if state == State::Open {
            warn!(breaker.name = %self.name, from = %from, to = %state, "breaker opened");
        } else {
            info!(breaker.name = %self.name, from = %from, to = %state, "breaker state changed");
        }

        self.callbacks.trigger_state_change(&self.name, from, state);
    }

    fn new_epoch(&self, generation: &mut Generation, now: Instant) {
        generation.epoch = generation.epoch.next();
        generation.counts.clear();
        generation.expiry = match generation.state {
            State::Open => now.checked_add(self.timeout),
            State::Closed => self.interval.and_then(|interval| now.checked_add(interval)),
            State::HalfOpen => None,
        };
    }
}

impl std::fmt::Debug for Breaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Breaker")
            .field("name", &self.name)
            .field("max_requests", &self.max_requests)
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .field("callbacks", &self.callbacks)
            .field("clock", &self.clock)
            .field("generation", &self.generation.try_lock().as_deref())
            .finish()
    }
}

fn expired(expiry: Option<Instant>, now: Instant) -> bool {
    expiry.is_some_and(|expiry| expiry < now)
}

/// Admission granted by [`Breaker::allow`]
///
/// The permit is tied to the epoch in which it was granted; if the breaker
/// has moved to another epoch by the time it is settled, the outcome is
/// ignored. Dropping an unsettled permit (for example while a panic unwinds
/// through the guarded work) records a failure.
#[must_use = "an unsettled permit records a failure when dropped"]
#[derive(Debug)]
pub struct Permit<'a> {
    breaker: &'a Breaker,
    epoch: Epoch,
    settled: bool,
}

impl Permit<'_> {
    /// Record a successful outcome
    pub fn success(self) {
        self.settle(true);
    }

    /// Record a failed outcome
    pub fn failure(self) {
        self.settle(false);
    }

    fn settle(mut self, success: bool) {
        self.settled = true;
        self.breaker.after_request(self.epoch, success);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            debug!(
                breaker.name = %self.breaker.name,
                panicking = std::thread::panicking(),
                "permit dropped unsettled, recording failure"
            );
            self.breaker.after_request(self.epoch, false);
        }
    }
}
