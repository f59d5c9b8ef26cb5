//! Crash Detection
//!
//! Per-sample crash classification behind a single [`CrashDetector`] trait.
//! Two policies are provided:
//! - [`GForceDetector`]: acceleration magnitude above threshold
//! - [`SensorFusionDetector`]: acceleration *and* rotation-rate magnitude above
//!   their thresholds (the default)
//!
//! A dropped phone produces a high-G spike without the rotational shear of a
//! vehicle collision; requiring both rejects that case.

mod config;
mod detector;

pub use config::{
    CrashDetectionConfig, DetectionConfigError, DEFAULT_G_FORCE_THRESHOLD,
    DEFAULT_ROTATION_THRESHOLD,
};
pub use detector::{GForceDetector, SensorFusionDetector};

use motion::MotionSample;
use serde::{Deserialize, Serialize};

/// A crash classification policy
///
/// Implementations are pure: the same sample always yields the same answer
/// and evaluation never fails.
pub trait CrashDetector: Send + Sync {
    /// Classify a single sample
    fn evaluate(&self, sample: &MotionSample) -> bool;

    /// Short policy name for logs
    fn name(&self) -> &'static str;
}

/// Selectable detection policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStrategy {
    /// Acceleration magnitude only
    GForce,
    /// Acceleration and rotation rate
    #[default]
    SensorFusion,
}

impl DetectionStrategy {
    /// Build the detector for this strategy
    pub fn build(self, config: CrashDetectionConfig) -> Box<dyn CrashDetector> {
        match self {
            DetectionStrategy::GForce => Box::new(GForceDetector::new(config)),
            DetectionStrategy::SensorFusion => Box::new(SensorFusionDetector::new(config)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motion::Vector3;

    #[test]
    fn test_strategies_swap_behind_trait() {
        // High G with no rotation: only the single-threshold policy fires
        let sample = MotionSample::new(0, Vector3::new(3.0, 3.0, 3.0), Vector3::ZERO).unwrap();
        let config = CrashDetectionConfig::default();

        let detectors: Vec<Box<dyn CrashDetector>> = vec![
            DetectionStrategy::GForce.build(config),
            DetectionStrategy::SensorFusion.build(config),
        ];
        let verdicts: Vec<bool> = detectors.iter().map(|d| d.evaluate(&sample)).collect();

        assert_eq!(verdicts, vec![true, false]);
        assert_eq!(detectors[0].name(), "g_force");
        assert_eq!(detectors[1].name(), "sensor_fusion");
    }

    #[test]
    fn test_default_strategy_is_fusion() {
        assert_eq!(DetectionStrategy::default(), DetectionStrategy::SensorFusion);
    }
}
