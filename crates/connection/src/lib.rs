//! Telemetry Connections
//!
//! Provides the connection finite-state machine used by every external
//! telemetry provider, and an actor that drives a [`TelemetryLink`] through
//! that machine:
//!
//! ```text
//! Disconnected --connect--> Scanning --device found--> Connected
//!                             |  ^                       |
//!                     failure v  | retry                 | link lost
//!                           Error(reason)                v
//!                                                   Disconnected
//! ```
//!
//! `disconnect` is accepted from every state.

mod error;
mod machine;
mod source;
mod state;

pub use error::{ConnectionError, LinkError};
pub use machine::ConnectionStateMachine;
pub use source::{spawn_source, SourceConfig, SourceHandle, TelemetryLink};
pub use state::{next_state, ConnectionEvent, ConnectionState};
