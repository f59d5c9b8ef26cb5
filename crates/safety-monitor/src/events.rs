//! Outbound notifications for presentation layers

use connection::ConnectionState;
use serde::Serialize;

/// Which telemetry provider a notification is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetrySourceKind {
    Vehicle,
    Location,
}

impl TelemetrySourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TelemetrySourceKind::Vehicle => "vehicle",
            TelemetrySourceKind::Location => "location",
        }
    }
}

/// Everything the core tells the outside world
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SafetyEvent {
    /// The detector classified a sample as a collision
    CrashDetected {
        timestamp_ns: u64,
        g_force: f64,
        rotation_rate: f64,
    },
    ConnectionStateChanged {
        source: TelemetrySourceKind,
        state: ConnectionState,
    },
    /// A new escalation episode began
    CountdownStarted { remaining: u32 },
    CountdownTick { remaining: u32 },
    EmergencyTriggered,
    EmergencyCancelled,
    /// A crash was detected but the countdown could not be armed
    EscalationFailed { reason: String },
}
