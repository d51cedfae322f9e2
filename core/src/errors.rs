//! Error types for breaker operations

use thiserror::Error;

/// Reason a breaker refused to admit a call
///
/// Both variants are stable sentinels: compare them with `==` rather than by
/// message. They mean "try again later", never that the breaker is broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Rejection {
    /// The breaker is open and rejects every call until its timeout elapses
    #[error("breaker is open")]
    Open,
    /// The breaker is half-open and its probe quota for this epoch is used up
    #[error("too many requests")]
    TooManyRequests,
}

/// Errors returned by [`Breaker::execute`](crate::Breaker::execute)
#[derive(Debug, PartialEq, Eq, Error)]
pub enum BreakerError<E> {
    /// The operation was never invoked
    #[error(transparent)]
    Rejected(#[from] Rejection),
    /// The operation ran and returned this error, unchanged
    #[error(transparent)]
    Operation(E),
}

impl<E> BreakerError<E> {
    /// The rejection reason, if the breaker refused the call
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            BreakerError::Rejected(rejection) => Some(*rejection),
            BreakerError::Operation(_) => None,
        }
    }

    /// Whether the breaker refused the call without invoking the operation
    pub fn is_rejected(&self) -> bool {
        matches!(self, BreakerError::Rejected(_))
    }

    /// The operation's own error, if it ran and failed
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            BreakerError::Operation(error) => Some(error),
            BreakerError::Rejected(_) => None,
        }
    }
}
