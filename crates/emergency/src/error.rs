//! Emergency Error Types

use thiserror::Error;

/// The periodic tick could not be armed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// No async runtime to host the timer
    #[error("No runtime available for countdown timer: {0}")]
    NoRuntime(String),

    /// Scheduler refused the timer
    #[error("Scheduler unavailable: {0}")]
    Unavailable(String),
}

/// Countdown errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CountdownError {
    /// `max_duration` must be at least one tick
    #[error("Countdown duration must be greater than zero")]
    InvalidDuration,

    /// Escalation cannot proceed without a tick source
    #[error("Failed to arm countdown: {0}")]
    Schedule(#[from] ScheduleError),

    /// State lock poisoned by a panicking holder
    #[error("Countdown state lock error: {0}")]
    Lock(String),
}

/// Alert dispatch failure (logged, never retried)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Alert serialization error: {0}")]
    Serialization(String),

    #[error("Alert delivery failed: {0}")]
    Delivery(String),
}
