//! Alert dispatch

use crate::DispatchError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use telemetry::TelemetrySnapshot;
use tracing::{error, info};
use uuid::Uuid;

/// Payload handed to the dispatcher when a countdown expires
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyAlert {
    /// Escalation episode this alert closes
    pub episode_id: Uuid,
    pub triggered_at: DateTime<Utc>,
    /// Telemetry at the moment of triggering
    pub snapshot: TelemetrySnapshot,
}

/// External collaborator that places the call / sends the SMS
///
/// Invoked at most once per episode. Delivery is outside the countdown's
/// responsibility: errors are logged and not retried.
pub trait AlertDispatcher: Send + Sync {
    fn dispatch(&self, alert: &EmergencyAlert) -> Result<(), DispatchError>;
}

/// Dispatcher that records the alert in the log
#[derive(Debug, Clone)]
pub struct LoggingDispatcher {
    contact_number: String,
}

impl LoggingDispatcher {
    pub fn new(contact_number: impl Into<String>) -> Self {
        Self {
            contact_number: contact_number.into(),
        }
    }

    pub fn contact_number(&self) -> &str {
        &self.contact_number
    }
}

impl AlertDispatcher for LoggingDispatcher {
    fn dispatch(&self, alert: &EmergencyAlert) -> Result<(), DispatchError> {
        let payload =
            serde_json::to_string(alert).map_err(|e| DispatchError::Serialization(e.to_string()))?;

        error!(
            "TRIGGERING EMERGENCY CALL AND SMS to {}: location {}, speed {:.0} km/h",
            self.contact_number, alert.snapshot.location, alert.snapshot.vehicle.speed
        );
        info!("Emergency alert payload: {}", payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry::LocationSnapshot;

    #[test]
    fn test_alert_payload_round_trips_through_json() {
        let alert = EmergencyAlert {
            episode_id: Uuid::new_v4(),
            triggered_at: Utc::now(),
            snapshot: TelemetrySnapshot {
                location: LocationSnapshot {
                    latitude: 37.7749,
                    longitude: -122.4194,
                },
                emergency_active: true,
                ..Default::default()
            },
        };

        let json = serde_json::to_string(&alert).unwrap();
        assert!(json.contains("\"emergency_active\":true"));
        let parsed: EmergencyAlert = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.episode_id, alert.episode_id);
        assert_eq!(parsed.snapshot, alert.snapshot);
    }

    #[test]
    fn test_logging_dispatcher_succeeds() {
        let dispatcher = LoggingDispatcher::new("911");
        let alert = EmergencyAlert {
            episode_id: Uuid::nil(),
            triggered_at: Utc::now(),
            snapshot: TelemetrySnapshot::default(),
        };
        assert!(dispatcher.dispatch(&alert).is_ok());
        assert_eq!(dispatcher.contact_number(), "911");
    }
}
