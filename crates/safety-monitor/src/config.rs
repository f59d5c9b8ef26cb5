//! Monitor configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! TOML file, then `SAFETY_MONITOR_*` environment variables
//! (`SAFETY_MONITOR_EMERGENCY__COUNTDOWN_SECONDS=5`).

use crate::{MonitorError, ServiceMode};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use crash_detection::{CrashDetectionConfig, DetectionStrategy};
use motion::MAX_SAMPLE_RATE_HZ;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_VAR: &str = "SAFETY_MONITOR_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "safety-monitor.toml";
const ENV_PREFIX: &str = "SAFETY_MONITOR";

/// Top-level monitor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Service backends to build
    pub mode: ServiceMode,
    pub detection: DetectionSettings,
    pub emergency: EmergencySettings,
    pub motion: MotionSettings,
    pub telemetry: TelemetrySettings,
    pub simulation: SimulationSettings,
    pub logging: LoggingSettings,
}

/// Crash classifier selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    pub strategy: DetectionStrategy,
    pub thresholds: CrashDetectionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencySettings {
    /// Seconds the driver has to cancel (default: 10)
    pub countdown_seconds: u32,
    /// Number the dispatcher contacts
    pub contact_number: String,
}

impl Default for EmergencySettings {
    fn default() -> Self {
        Self {
            countdown_seconds: 10,
            contact_number: "911".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionSettings {
    /// IMU sample rate in Hz (default: 10)
    pub sample_rate_hz: u32,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self { sample_rate_hz: 10 }
    }
}

/// Telemetry polling intervals (milliseconds)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub vehicle_interval_ms: u64,
    pub location_interval_ms: u64,
    /// Simulated scan before a provider connects
    pub scan_delay_ms: u64,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            vehicle_interval_ms: 500,
            location_interval_ms: 1000,
            scan_delay_ms: 2000,
        }
    }
}

impl TelemetrySettings {
    pub fn vehicle_interval(&self) -> Duration {
        Duration::from_millis(self.vehicle_interval_ms)
    }

    pub fn location_interval(&self) -> Duration {
        Duration::from_millis(self.location_interval_ms)
    }

    pub fn scan_delay(&self) -> Duration {
        Duration::from_millis(self.scan_delay_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Inject a synthetic crash this many seconds after startup
    pub crash_after_secs: Option<u64>,
    /// Seed for the synthetic IMU noise
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Maximum level: trace, debug, info, warn, error
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingSettings {
    pub fn max_level(&self) -> Result<Level, MonitorError> {
        Level::from_str(&self.level)
            .map_err(|_| MonitorError::InvalidConfig(format!("unknown log level '{}'", self.level)))
    }
}

impl MonitorConfig {
    /// Load from the file named by `SAFETY_MONITOR_CONFIG` (or
    /// `safety-monitor.toml`, if present) and the environment
    pub fn load() -> Result<Self, MonitorError> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let builder = Self::defaults()?
            .add_source(File::with_name(&path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        Self::finish(builder)
    }

    /// Parse a TOML document layered over the defaults
    pub fn from_toml(toml: &str) -> Result<Self, MonitorError> {
        let builder = Self::defaults()?.add_source(File::from_str(toml, FileFormat::Toml));
        Self::finish(builder)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, MonitorError> {
        Ok(Config::builder().add_source(Config::try_from(&MonitorConfig::default())?))
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self, MonitorError> {
        let config: MonitorConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the services cannot run with
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.emergency.countdown_seconds == 0 {
            return Err(MonitorError::InvalidConfig(
                "emergency.countdown_seconds must be at least 1".into(),
            ));
        }
        if self.emergency.contact_number.trim().is_empty() {
            return Err(MonitorError::InvalidConfig(
                "emergency.contact_number must not be empty".into(),
            ));
        }
        if self.motion.sample_rate_hz == 0 || self.motion.sample_rate_hz > MAX_SAMPLE_RATE_HZ {
            return Err(MonitorError::InvalidConfig(format!(
                "motion.sample_rate_hz must be between 1 and {}",
                MAX_SAMPLE_RATE_HZ
            )));
        }
        let t = &self.telemetry;
        if t.vehicle_interval_ms == 0 || t.location_interval_ms == 0 {
            return Err(MonitorError::InvalidConfig(
                "telemetry poll intervals must be non-zero".into(),
            ));
        }
        self.logging.max_level()?;
        Ok(())
    }
}
