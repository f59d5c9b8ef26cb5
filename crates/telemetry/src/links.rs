//! Simulated telemetry links
//!
//! Stand-ins for the OBD-II dongle and the GPS receiver, used in simulation
//! mode and in tests.

use crate::{LocationSnapshot, VehicleSnapshot};
use connection::{LinkError, TelemetryLink};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::{debug, info};

/// Starting point of the simulated drive (San Francisco)
const START_LATITUDE: f64 = 37.7749;
const START_LONGITUDE: f64 = -122.4194;
/// Per-reading heading north-east
const STEP_DEGREES: f64 = 0.0001;

const IDLE_RPM: f64 = 1000.0;
const RPM_PER_KMH: f64 = 30.0;
const RPM_JITTER: f64 = 50.0;
const CRUISE_SPEED_KMH: f64 = 100.0;

fn unix_seconds() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Simulated ELM327 link: accelerates to cruise speed, then eases off
#[derive(Debug, Default)]
pub struct SimulatedVehicleLink {
    speed: f64,
    readings: u64,
    open: bool,
    unavailable: Option<String>,
}

impl SimulatedVehicleLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A link whose adapter can never be reached
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            unavailable: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Deterministic jitter in [-RPM_JITTER, RPM_JITTER]
    fn jitter(&self) -> f64 {
        let mut hasher = DefaultHasher::new();
        self.readings.hash(&mut hasher);
        let unit = (hasher.finish() % 1001) as f64 / 1000.0;
        (unit * 2.0 - 1.0) * RPM_JITTER
    }
}

impl TelemetryLink for SimulatedVehicleLink {
    type Reading = VehicleSnapshot;

    fn open(&mut self) -> Result<(), LinkError> {
        if let Some(reason) = &self.unavailable {
            return Err(LinkError::Unavailable(reason.clone()));
        }
        info!("Simulated OBD adapter connected");
        self.open = true;
        Ok(())
    }

    fn read(&mut self) -> Result<Option<VehicleSnapshot>, LinkError> {
        if !self.open {
            return Err(LinkError::Read("adapter not open".into()));
        }

        self.readings += 1;
        if self.speed < CRUISE_SPEED_KMH {
            self.speed += 2.0;
        } else {
            self.speed -= 1.0;
        }

        Ok(Some(VehicleSnapshot {
            rpm: IDLE_RPM + self.speed * RPM_PER_KMH + self.jitter(),
            speed: self.speed,
            timestamp: unix_seconds(),
        }))
    }

    fn close(&mut self) {
        if self.open {
            debug!("Simulated OBD adapter closed");
        }
        self.open = false;
    }
}

/// Simulated GPS link: a straight drive north-east
#[derive(Debug)]
pub struct SimulatedLocationLink {
    latitude: f64,
    longitude: f64,
    open: bool,
    unavailable: Option<String>,
}

impl SimulatedLocationLink {
    pub fn new() -> Self {
        Self {
            latitude: START_LATITUDE,
            longitude: START_LONGITUDE,
            open: false,
            unavailable: None,
        }
    }

    /// A link whose receiver is switched off or not permitted
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            unavailable: Some(reason.into()),
            ..Self::new()
        }
    }
}

impl Default for SimulatedLocationLink {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryLink for SimulatedLocationLink {
    type Reading = LocationSnapshot;

    fn open(&mut self) -> Result<(), LinkError> {
        if let Some(reason) = &self.unavailable {
            return Err(LinkError::Unavailable(reason.clone()));
        }
        info!("Simulated location updates started");
        self.open = true;
        Ok(())
    }

    fn read(&mut self) -> Result<Option<LocationSnapshot>, LinkError> {
        if !self.open {
            return Err(LinkError::Read("location updates not started".into()));
        }

        self.latitude += STEP_DEGREES;
        self.longitude += STEP_DEGREES;

        Ok(Some(LocationSnapshot {
            latitude: self.latitude,
            longitude: self.longitude,
        }))
    }

    fn close(&mut self) {
        self.open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_ramps_to_cruise() {
        let mut link = SimulatedVehicleLink::new();
        link.open().unwrap();

        let first = link.read().unwrap().unwrap();
        assert_eq!(first.speed, 2.0);
        assert!((first.rpm - 1060.0).abs() <= RPM_JITTER);

        let mut last = first;
        for _ in 0..60 {
            last = link.read().unwrap().unwrap();
        }
        assert!(last.speed <= CRUISE_SPEED_KMH + 2.0);
        assert!(last.speed >= CRUISE_SPEED_KMH - 2.0);
    }

    #[test]
    fn test_vehicle_read_requires_open() {
        let mut link = SimulatedVehicleLink::new();
        assert!(matches!(link.read(), Err(LinkError::Read(_))));
    }

    #[test]
    fn test_unavailable_vehicle_link() {
        let mut link = SimulatedVehicleLink::unavailable("Bluetooth not powered on");
        assert_eq!(
            link.open(),
            Err(LinkError::Unavailable("Bluetooth not powered on".into()))
        );
    }

    #[test]
    fn test_location_moves_north_east() {
        let mut link = SimulatedLocationLink::new();
        link.open().unwrap();

        let a = link.read().unwrap().unwrap();
        let b = link.read().unwrap().unwrap();
        assert!((a.latitude - (START_LATITUDE + STEP_DEGREES)).abs() < 1e-9);
        assert!(b.latitude > a.latitude);
        assert!(b.longitude > a.longitude);
    }

    #[test]
    fn test_unavailable_location_link() {
        let mut link = SimulatedLocationLink::unavailable("Location permission denied");
        assert!(link.open().is_err());
    }
}
