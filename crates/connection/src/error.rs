//! Connection Error Types

use crate::{ConnectionEvent, ConnectionState};
use thiserror::Error;

/// Errors raised by the state machine or a source handle
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConnectionError {
    /// Event has no transition from the current state
    #[error("No transition for {event:?} from {from:?}")]
    InvalidTransition {
        from: ConnectionState,
        event: ConnectionEvent,
    },

    /// The source actor has shut down
    #[error("Telemetry source {0} is no longer running")]
    SourceClosed(String),
}

/// Errors reported by a hardware link
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// Radio or sensor is off, missing, or not permitted
    #[error("{0}")]
    Unavailable(String),

    /// Device was found but the connection could not be opened
    #[error("Connection failed: {0}")]
    ConnectFailed(String),

    /// Established link dropped
    #[error("Link lost: {0}")]
    Lost(String),

    /// A single read failed; the link stays up
    #[error("Read failed: {0}")]
    Read(String),
}
