//! Telemetry snapshot types

use serde::{Deserialize, Serialize};

/// Latest vehicle diagnostics reading
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    /// Engine speed (RPM)
    pub rpm: f64,
    /// Vehicle speed (km/h)
    pub speed: f64,
    /// Reading time (unix seconds)
    pub timestamp: f64,
}

/// Latest position fix
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LocationSnapshot {
    pub latitude: f64,
    pub longitude: f64,
}

impl std::fmt::Display for LocationSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Merged view over all telemetry
///
/// `Default` is the all-zero snapshot served before any data arrives.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub vehicle: VehicleSnapshot,
    pub location: LocationSnapshot,
    pub emergency_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        let loc = LocationSnapshot {
            latitude: 37.77491234,
            longitude: -122.41941234,
        };
        assert_eq!(loc.to_string(), "37.7749, -122.4194");
    }

    #[test]
    fn test_default_is_zero() {
        let snapshot = TelemetrySnapshot::default();
        assert_eq!(snapshot.vehicle.rpm, 0.0);
        assert_eq!(snapshot.location.latitude, 0.0);
        assert!(!snapshot.emergency_active);
    }
}
