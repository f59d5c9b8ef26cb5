//! Crash detector policies

use crate::{CrashDetectionConfig, CrashDetector};
use motion::MotionSample;
use tracing::{debug, warn};

/// Single-threshold detector: acceleration magnitude only
#[derive(Debug, Clone)]
pub struct GForceDetector {
    config: CrashDetectionConfig,
}

impl GForceDetector {
    pub fn new(config: CrashDetectionConfig) -> Self {
        Self { config }
    }
}

impl CrashDetector for GForceDetector {
    fn evaluate(&self, sample: &MotionSample) -> bool {
        let g_force = sample.g_force();

        if g_force > self.config.g_force_threshold() {
            warn!("Potential crash detected: {:.3} G", g_force);
            return true;
        }

        false
    }

    fn name(&self) -> &'static str {
        "g_force"
    }
}

/// Sensor-fusion detector: impact force and rotational violence together
#[derive(Debug, Clone)]
pub struct SensorFusionDetector {
    config: CrashDetectionConfig,
}

impl SensorFusionDetector {
    pub fn new(config: CrashDetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CrashDetectionConfig {
        &self.config
    }
}

impl CrashDetector for SensorFusionDetector {
    fn evaluate(&self, sample: &MotionSample) -> bool {
        let g_force = sample.g_force();
        if g_force <= self.config.g_force_threshold() {
            return false;
        }

        let rotation_rate = sample.rotation_rate();
        if rotation_rate > self.config.rotation_threshold() {
            warn!(
                "Crash detected via fusion: {:.3} G, {:.3} rad/s",
                g_force, rotation_rate
            );
            true
        } else {
            debug!(
                "High G ({:.3}) but low rotation ({:.3} rad/s), likely a dropped phone",
                g_force, rotation_rate
            );
            false
        }
    }

    fn name(&self) -> &'static str {
        "sensor_fusion"
    }
}
