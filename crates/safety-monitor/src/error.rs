//! Monitor Error Types

use connection::ConnectionError;
use emergency::CountdownError;
use motion::MotionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Configuration parsed but failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Device mode selected without hardware bindings
    #[error("Device mode requires hardware bindings")]
    MissingHardware,

    #[error("Motion source error: {0}")]
    Motion(#[from] MotionError),

    #[error("Countdown error: {0}")]
    Countdown(#[from] CountdownError),

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    /// The monitor loop is gone
    #[error("Monitor is not running")]
    NotRunning,
}
