//! Emergency Escalation
//!
//! Turns a detected crash into either a confirmed alert or a user-cancelled
//! no-op. The countdown ticks once per period through a [`TickScheduler`]
//! and, on reaching zero, hands an [`EmergencyAlert`] to the
//! [`AlertDispatcher`] exactly once per episode.

mod countdown;
mod dispatch;
mod error;
mod scheduler;

pub use countdown::{
    CountdownConfig, CountdownEvent, EmergencyCountdown, EmergencyPhase, EmergencyState,
};
pub use dispatch::{AlertDispatcher, EmergencyAlert, LoggingDispatcher};
pub use error::{CountdownError, DispatchError, ScheduleError};
pub use scheduler::{ManualScheduler, TickFn, TickHandle, TickScheduler, TokioScheduler};
