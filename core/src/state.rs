//! Breaker state tags

use std::fmt;

/// Logical state of a breaker
///
/// - `Closed`: calls flow through and outcomes are counted
/// - `HalfOpen`: a limited number of probe calls decide whether to recover
/// - `Open`: every call is rejected until the timeout elapses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum State {
    #[default]
    Closed,
    HalfOpen,
    Open,
}

impl State {
    /// Human-readable name of the state
    pub const fn as_str(self) -> &'static str {
        match self {
            State::Closed => "closed",
            State::HalfOpen => "half-open",
            State::Open => "open",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
