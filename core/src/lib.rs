//! Tripwire - epoch-guarded circuit breaker
//!
//! This crate provides a circuit breaker that many threads can share:
//! - State machine for the breaker lifecycle (Closed → Open → HalfOpen → Closed)
//! - Per-epoch request accounting, optionally reset on a fixed interval
//! - Stale outcomes from a previous epoch are discarded, never miscounted
//! - Panics inside the wrapped operation count as failures and keep unwinding
//! - Pluggable clock so timeouts can be tested without sleeping
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use tripwire::{Breaker, BreakerError, Rejection, State};
//!
//! let breaker = Breaker::builder("payment_api")
//!     .max_requests(2)
//!     .timeout(Duration::from_secs(30))
//!     .ready_to_trip(|counts| counts.consecutive_failures >= 3)
//!     .on_state_change(|name, from, to| println!("breaker {name}: {from} -> {to}"))
//!     .build();
//!
//! // Execute with breaker protection
//! let result = breaker.execute(|| {
//!     // Your service call here
//!     Ok::<_, String>("success")
//! });
//! assert_eq!(result, Ok("success"));
//!
//! for _ in 0..3 {
//!     let _ = breaker.execute(|| Err::<(), _>("timeout".to_string()));
//! }
//!
//! // Check breaker state
//! assert_eq!(breaker.state(), State::Open);
//! assert_eq!(
//!     breaker.execute(|| Ok::<_, String>("skipped")),
//!     Err(BreakerError::Rejected(Rejection::Open))
//! );
//! ```

pub mod breaker;
pub mod builder;
pub mod callbacks;
pub mod clock;
pub mod counts;
pub mod errors;
pub mod state;

pub use breaker::{Breaker, Permit, Settings};
pub use builder::BreakerBuilder;
pub use callbacks::{StateChangeFn, TripPredicate};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use counts::Counts;
pub use errors::{BreakerError, Rejection};
pub use state::State;
