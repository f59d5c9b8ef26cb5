//! Crash detection configuration

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default G-force threshold (G)
pub const DEFAULT_G_FORCE_THRESHOLD: f64 = 3.0;
/// Default rotation threshold, ~286 deg/s (rad/s)
pub const DEFAULT_ROTATION_THRESHOLD: f64 = 5.0;

/// Invalid threshold supplied to [`CrashDetectionConfig`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectionConfigError {
    #[error("{field} must be finite and greater than zero, got {value}")]
    NonPositiveThreshold { field: &'static str, value: f64 },
}

/// Detection thresholds
///
/// Immutable once built; both thresholds are guaranteed finite and strictly
/// positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawThresholds")]
pub struct CrashDetectionConfig {
    g_force_threshold: f64,
    rotation_threshold: f64,
}

#[derive(Deserialize)]
struct RawThresholds {
    #[serde(default = "default_g_force")]
    g_force_threshold: f64,
    #[serde(default = "default_rotation")]
    rotation_threshold: f64,
}

fn default_g_force() -> f64 {
    DEFAULT_G_FORCE_THRESHOLD
}

fn default_rotation() -> f64 {
    DEFAULT_ROTATION_THRESHOLD
}

impl TryFrom<RawThresholds> for CrashDetectionConfig {
    type Error = DetectionConfigError;

    fn try_from(raw: RawThresholds) -> Result<Self, Self::Error> {
        Self::new(raw.g_force_threshold, raw.rotation_threshold)
    }
}

impl CrashDetectionConfig {
    pub fn new(g_force_threshold: f64, rotation_threshold: f64) -> Result<Self, DetectionConfigError> {
        check_threshold("g_force_threshold", g_force_threshold)?;
        check_threshold("rotation_threshold", rotation_threshold)?;
        Ok(Self {
            g_force_threshold,
            rotation_threshold,
        })
    }

    /// Impact threshold in G
    pub fn g_force_threshold(&self) -> f64 {
        self.g_force_threshold
    }

    /// Rotation-rate threshold in rad/s
    pub fn rotation_threshold(&self) -> f64 {
        self.rotation_threshold
    }
}

impl Default for CrashDetectionConfig {
    fn default() -> Self {
        Self {
            g_force_threshold: DEFAULT_G_FORCE_THRESHOLD,
            rotation_threshold: DEFAULT_ROTATION_THRESHOLD,
        }
    }
}

fn check_threshold(field: &'static str, value: f64) -> Result<(), DetectionConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DetectionConfigError::NonPositiveThreshold { field, value })
    }
}
