//! Drive Safety Monitor
//!
//! Composition root: loads configuration, builds the service aggregate for
//! the selected mode, and runs the single-owner loop that feeds motion
//! samples to the crash detector and drives the emergency countdown.

mod config;
mod error;
mod events;
mod factory;
mod logging;
mod monitor;

pub use config::{
    DetectionSettings, EmergencySettings, LoggingSettings, MonitorConfig, MotionSettings,
    SimulationSettings, TelemetrySettings,
};
pub use error::MonitorError;
pub use events::{SafetyEvent, TelemetrySourceKind};
pub use factory::{build_services, HardwareBindings, ServiceMode, Services};
pub use logging::init_logging;
pub use monitor::{MonitorHandle, SafetyMonitor};
