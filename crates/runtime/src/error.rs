//! Runtime error types

use domwatch_dom::DomError;
use thiserror::Error;

/// Runtime result type
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Event loop errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error(transparent)]
    Dom(#[from] DomError),

    /// The loop was driven from inside one of its own callbacks
    #[error("Event loop re-entered from inside a callback")]
    Reentrant,

    #[error("Cannot move the clock backwards (target={target}, now_ms={now_ms})")]
    TimeTravel { target: u64, now_ms: u64 },

    /// Too many tasks ran in one drive call (self-rescheduling timers or
    /// observers that keep mutating what they observe)
    #[error("Exceeded max steps: limit={limit}, now_ms={now_ms}, pending_timers={pending_timers}")]
    StepLimit {
        limit: usize,
        now_ms: u64,
        pending_timers: usize,
    },
}
