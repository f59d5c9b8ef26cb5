//! Motion sample types

use crate::MotionError;
use serde::{Deserialize, Serialize};

/// Three-axis vector used for acceleration (G) and rotation rate (rad/s)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean norm
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// One motion reading
///
/// Only constructible through [`MotionSample::new`], which rejects non-finite
/// components, so a `MotionSample` in hand is always well-formed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MotionSample {
    timestamp_ns: u64,
    acceleration: Vector3,
    rotation: Vector3,
}

impl MotionSample {
    /// Validate and build a sample
    pub fn new(
        timestamp_ns: u64,
        acceleration: Vector3,
        rotation: Vector3,
    ) -> Result<Self, MotionError> {
        if !acceleration.is_finite() {
            return Err(MotionError::NonFinite {
                field: "acceleration",
                timestamp_ns,
            });
        }
        if !rotation.is_finite() {
            return Err(MotionError::NonFinite {
                field: "rotation",
                timestamp_ns,
            });
        }

        Ok(Self {
            timestamp_ns,
            acceleration,
            rotation,
        })
    }

    /// Monotonic timestamp in nanoseconds
    pub fn timestamp_ns(&self) -> u64 {
        self.timestamp_ns
    }

    /// Acceleration in G
    pub fn acceleration(&self) -> Vector3 {
        self.acceleration
    }

    /// Rotation rate in rad/s
    pub fn rotation(&self) -> Vector3 {
        self.rotation
    }

    /// Acceleration magnitude in G
    pub fn g_force(&self) -> f64 {
        self.acceleration.magnitude()
    }

    /// Rotation-rate magnitude in rad/s
    pub fn rotation_rate(&self) -> f64 {
        self.rotation.magnitude()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn non_finite() -> impl Strategy<Value = f64> {
        prop_oneof![Just(f64::NAN), Just(f64::INFINITY), Just(f64::NEG_INFINITY)]
    }

    #[test]
    fn test_magnitude() {
        let v = Vector3::new(3.0, 4.0, 0.0);
        assert_eq!(v.magnitude(), 5.0);
        assert_eq!(Vector3::ZERO.magnitude(), 0.0);
    }

    #[test]
    fn test_sample_accessors() {
        let sample = MotionSample::new(
            42,
            Vector3::new(3.0, 3.0, 3.0),
            Vector3::new(4.0, 4.0, 4.0),
        )
        .unwrap();

        assert_eq!(sample.timestamp_ns(), 42);
        assert!((sample.g_force() - 5.196).abs() < 1e-3);
        assert!((sample.rotation_rate() - 6.928).abs() < 1e-3);
    }

    #[test]
    fn test_rejects_nan_acceleration() {
        let err = MotionSample::new(7, Vector3::new(f64::NAN, 0.0, 0.0), Vector3::ZERO)
            .unwrap_err();
        assert_eq!(
            err,
            MotionError::NonFinite {
                field: "acceleration",
                timestamp_ns: 7
            }
        );
    }

    #[test]
    fn test_rejects_infinite_rotation() {
        let err = MotionSample::new(1, Vector3::ZERO, Vector3::new(0.0, f64::INFINITY, 0.0))
            .unwrap_err();
        assert!(matches!(err, MotionError::NonFinite { field: "rotation", .. }));
    }

    proptest! {
        #[test]
        fn prop_finite_vectors_accepted(
            ts in any::<u64>(),
            ax in -1e6f64..1e6, ay in -1e6f64..1e6, az in -1e6f64..1e6,
            rx in -1e6f64..1e6, ry in -1e6f64..1e6, rz in -1e6f64..1e6,
        ) {
            let sample = MotionSample::new(ts, Vector3::new(ax, ay, az), Vector3::new(rx, ry, rz));
            prop_assert!(sample.is_ok());
        }

        #[test]
        fn prop_non_finite_acceleration_named(
            ts in any::<u64>(),
            bad in non_finite(),
            axis in 0usize..3,
            other in -10.0f64..10.0,
        ) {
            let mut components = [other; 3];
            components[axis] = bad;
            let acceleration = Vector3::new(components[0], components[1], components[2]);

            let err = MotionSample::new(ts, acceleration, Vector3::ZERO).unwrap_err();
            prop_assert_eq!(err, MotionError::NonFinite { field: "acceleration", timestamp_ns: ts });
        }

        #[test]
        fn prop_non_finite_rotation_named(
            ts in any::<u64>(),
            bad in non_finite(),
            axis in 0usize..3,
        ) {
            let mut components = [0.5; 3];
            components[axis] = bad;
            let rotation = Vector3::new(components[0], components[1], components[2]);

            let err = MotionSample::new(ts, Vector3::ZERO, rotation).unwrap_err();
            prop_assert_eq!(err, MotionError::NonFinite { field: "rotation", timestamp_ns: ts });
        }
    }
}
