//! Synthetic motion driver for simulation mode

use crate::{MotionDriver, MotionError, RawMotionReading, Vector3};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::info;

/// Peak per-axis noise for ordinary driving (G)
const NOISE_AMPLITUDE: f64 = 0.1;

/// Readings emitted when a crash is simulated: ~5.2 G at ~6.9 rad/s
const CRASH_ACCELERATION: Vector3 = Vector3 {
    x: 3.0,
    y: 3.0,
    z: 3.0,
};
const CRASH_ROTATION: Vector3 = Vector3 {
    x: 4.0,
    y: 4.0,
    z: 4.0,
};

/// Handle used to request a simulated impact from outside the sampling task
#[derive(Debug, Clone, Default)]
pub struct CrashTrigger {
    pending: Arc<AtomicBool>,
}

impl CrashTrigger {
    /// Make the next reading a crash signature
    pub fn simulate_crash(&self) {
        info!("Simulating crash event");
        self.pending.store(true, Ordering::SeqCst);
    }

    fn take(&self) -> bool {
        self.pending.swap(false, Ordering::SeqCst)
    }
}

/// Driver producing small random movements with an injectable crash
pub struct SyntheticDriver {
    started: Instant,
    counter: u64,
    seed: u64,
    trigger: CrashTrigger,
}

impl SyntheticDriver {
    pub fn new(seed: u64) -> Self {
        Self {
            started: Instant::now(),
            counter: 0,
            seed,
            trigger: CrashTrigger::default(),
        }
    }

    /// Trigger handle shared with this driver
    pub fn crash_trigger(&self) -> CrashTrigger {
        self.trigger.clone()
    }

    /// Deterministic pseudo-random value in [-amplitude, amplitude]
    fn noise(&self, axis: u8) -> f64 {
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        self.counter.hash(&mut hasher);
        axis.hash(&mut hasher);
        let unit = (hasher.finish() % 10_001) as f64 / 10_000.0;
        (unit * 2.0 - 1.0) * NOISE_AMPLITUDE
    }
}

impl MotionDriver for SyntheticDriver {
    fn open(&mut self) -> Result<(), MotionError> {
        info!("Starting synthetic motion driver");
        self.started = Instant::now();
        Ok(())
    }

    fn read(&mut self) -> Result<RawMotionReading, MotionError> {
        self.counter += 1;
        let timestamp_ns = self.started.elapsed().as_nanos() as u64;

        if self.trigger.take() {
            return Ok(RawMotionReading {
                timestamp_ns,
                acceleration: CRASH_ACCELERATION,
                rotation: CRASH_ROTATION,
            });
        }

        Ok(RawMotionReading {
            timestamp_ns,
            acceleration: Vector3::new(self.noise(0), self.noise(1), self.noise(2)),
            rotation: Vector3::ZERO,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_stays_small() {
        let mut driver = SyntheticDriver::new(7);
        driver.open().unwrap();
        for _ in 0..200 {
            let reading = driver.read().unwrap();
            assert!(reading.acceleration.x.abs() <= NOISE_AMPLITUDE);
            assert!(reading.acceleration.y.abs() <= NOISE_AMPLITUDE);
            assert!(reading.acceleration.z.abs() <= NOISE_AMPLITUDE);
            assert_eq!(reading.rotation, Vector3::ZERO);
        }
    }

    #[test]
    fn test_simulated_crash_is_one_shot() {
        let mut driver = SyntheticDriver::new(1);
        let trigger = driver.crash_trigger();
        driver.open().unwrap();

        trigger.simulate_crash();
        let crash = driver.read().unwrap();
        assert_eq!(crash.acceleration, CRASH_ACCELERATION);
        assert_eq!(crash.rotation, CRASH_ROTATION);

        let next = driver.read().unwrap();
        assert!(next.acceleration.magnitude() < 1.0);
    }
}
