//! Motion Error Types

use thiserror::Error;

/// Errors raised at the motion-source boundary
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MotionError {
    /// A reading contained NaN or infinite components
    #[error("Non-finite {field} in motion reading at t={timestamp_ns}ns")]
    NonFinite {
        field: &'static str,
        timestamp_ns: u64,
    },

    /// The underlying driver could not be opened
    #[error("Motion sensing unavailable: {0}")]
    Unavailable(String),

    /// The driver failed to produce a reading
    #[error("Motion read failed: {0}")]
    Read(String),

    /// Sources produce a single, non-restartable sequence
    #[error("Motion source already started")]
    AlreadyStarted,

    /// Sample rate must be between 1 Hz and 1 MHz
    #[error("Invalid sample rate: {0} Hz")]
    InvalidRate(u32),
}
