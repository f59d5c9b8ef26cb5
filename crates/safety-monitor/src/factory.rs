//! Service construction
//!
//! `build_services` is a pure factory: it selects backends for the
//! configured mode and wires nothing up. Sources and timers are started by
//! [`SafetyMonitor::start`](crate::SafetyMonitor::start).

use crate::{MonitorConfig, MonitorError};
use connection::TelemetryLink;
use crash_detection::CrashDetector;
use emergency::{AlertDispatcher, LoggingDispatcher, TickScheduler, TokioScheduler};
use motion::{CrashTrigger, DriverMotionSource, MotionDriver, MotionSource, MotionSourceConfig, SyntheticDriver};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use telemetry::{LocationSnapshot, SimulatedLocationLink, SimulatedVehicleLink, VehicleSnapshot};
use tracing::info;

/// Which backends to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceMode {
    /// Synthetic IMU and simulated OBD/GPS providers
    #[default]
    Simulation,
    /// Platform drivers supplied by the embedding application
    Device,
}

/// Platform drivers for device mode
pub struct HardwareBindings {
    pub motion: Box<dyn MotionDriver>,
    pub vehicle: Box<dyn TelemetryLink<Reading = VehicleSnapshot>>,
    pub location: Box<dyn TelemetryLink<Reading = LocationSnapshot>>,
}

/// Everything the monitor needs, not yet started
pub struct Services {
    pub motion: Box<dyn MotionSource>,
    pub detector: Box<dyn CrashDetector>,
    pub vehicle: Box<dyn TelemetryLink<Reading = VehicleSnapshot>>,
    pub location: Box<dyn TelemetryLink<Reading = LocationSnapshot>>,
    pub scheduler: Arc<dyn TickScheduler>,
    pub dispatcher: Arc<dyn AlertDispatcher>,
    /// Present only in simulation mode
    pub crash_trigger: Option<CrashTrigger>,
}

/// Build the service aggregate for `config.mode`
///
/// Device mode without `hardware` is an error; simulation mode ignores it.
pub fn build_services(
    config: &MonitorConfig,
    hardware: Option<HardwareBindings>,
) -> Result<Services, MonitorError> {
    let motion_config = MotionSourceConfig {
        sample_rate_hz: config.motion.sample_rate_hz,
        ..Default::default()
    };

    let (motion_driver, vehicle, location, crash_trigger): (
        Box<dyn MotionDriver>,
        Box<dyn TelemetryLink<Reading = VehicleSnapshot>>,
        Box<dyn TelemetryLink<Reading = LocationSnapshot>>,
        Option<CrashTrigger>,
    ) = match config.mode {
        ServiceMode::Simulation => {
            let driver = SyntheticDriver::new(config.simulation.seed);
            let trigger = driver.crash_trigger();
            (
                Box::new(driver),
                Box::new(SimulatedVehicleLink::new()),
                Box::new(SimulatedLocationLink::new()),
                Some(trigger),
            )
        }
        ServiceMode::Device => {
            let hw = hardware.ok_or(MonitorError::MissingHardware)?;
            (hw.motion, hw.vehicle, hw.location, None)
        }
    };

    let detector = config
        .detection
        .strategy
        .build(config.detection.thresholds);

    info!(
        "Built {:?} services with {} detector",
        config.mode,
        detector.name()
    );

    Ok(Services {
        motion: Box::new(DriverMotionSource::new(motion_driver, motion_config)),
        detector,
        vehicle,
        location,
        scheduler: Arc::new(TokioScheduler::new()),
        dispatcher: Arc::new(LoggingDispatcher::new(config.emergency.contact_number.clone())),
        crash_trigger,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crash_detection::DetectionStrategy;
    use motion::{MotionError, RawMotionReading, Vector3};

    struct IdleDriver;

    impl MotionDriver for IdleDriver {
        fn open(&mut self) -> Result<(), MotionError> {
            Ok(())
        }

        fn read(&mut self) -> Result<RawMotionReading, MotionError> {
            Ok(RawMotionReading {
                timestamp_ns: 0,
                acceleration: Vector3::ZERO,
                rotation: Vector3::ZERO,
            })
        }
    }

    #[test]
    fn test_simulation_provides_crash_trigger() {
        let services = build_services(&MonitorConfig::default(), None).unwrap();
        assert!(services.crash_trigger.is_some());
        assert_eq!(services.detector.name(), "sensor_fusion");
    }

    #[test]
    fn test_strategy_follows_config() {
        let mut config = MonitorConfig::default();
        config.detection.strategy = DetectionStrategy::GForce;
        let services = build_services(&config, None).unwrap();
        assert_eq!(services.detector.name(), "g_force");
    }

    #[test]
    fn test_device_mode_requires_hardware() {
        let config = MonitorConfig {
            mode: ServiceMode::Device,
            ..Default::default()
        };
        assert!(matches!(
            build_services(&config, None),
            Err(MonitorError::MissingHardware)
        ));
    }

    #[test]
    fn test_device_mode_uses_bindings() {
        let config = MonitorConfig {
            mode: ServiceMode::Device,
            ..Default::default()
        };
        let hardware = HardwareBindings {
            motion: Box::new(IdleDriver),
            vehicle: Box::new(SimulatedVehicleLink::new()),
            location: Box::new(SimulatedLocationLink::new()),
        };
        let services = build_services(&config, Some(hardware)).unwrap();
        assert!(services.crash_trigger.is_none());
    }
}
