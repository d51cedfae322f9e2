//! Hooks injected into a breaker: the trip predicate and the state-change callback

use crate::{Counts, State};
use std::sync::Arc;

/// Predicate deciding, after a failure in the closed state, whether to open
pub type TripPredicate = Arc<dyn Fn(&Counts) -> bool + Send + Sync>;

/// Callback receiving `(breaker name, from, to)` on every state change
pub type StateChangeFn = Arc<dyn Fn(&str, State, State) + Send + Sync>;

/// Callbacks for breaker state transitions
///
/// Callbacks run while the breaker's lock is held, after the transition has
/// been fully applied. They must not call back into the same breaker: doing so
/// deadlocks.
#[derive(Clone, Default)]
pub(crate) struct Callbacks {
    pub(crate) on_state_change: Option<StateChangeFn>,
}

impl Callbacks {
    pub(crate) fn trigger_state_change(&self, breaker: &str, from: State, to: State) {
        if let Some(ref callback) = self.on_state_change {
            callback(breaker, from, to);
        }
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_state_change", &self.on_state_change.is_some())
            .finish()
    }
}
