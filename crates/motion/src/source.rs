//! Driver-backed motion source

use crate::{MotionError, MotionSample, Vector3};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Highest sample rate with a non-zero microsecond period
pub const MAX_SAMPLE_RATE_HZ: u32 = 1_000_000;

/// Unvalidated reading as delivered by a hardware or synthetic driver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawMotionReading {
    pub timestamp_ns: u64,
    pub acceleration: Vector3,
    pub rotation: Vector3,
}

impl TryFrom<RawMotionReading> for MotionSample {
    type Error = MotionError;

    fn try_from(raw: RawMotionReading) -> Result<Self, Self::Error> {
        MotionSample::new(raw.timestamp_ns, raw.acceleration, raw.rotation)
    }
}

/// Hardware binding for an accelerometer/gyroscope pair
pub trait MotionDriver: Send + 'static {
    /// Prepare the device for reading
    fn open(&mut self) -> Result<(), MotionError>;

    /// Read one sample
    fn read(&mut self) -> Result<RawMotionReading, MotionError>;
}

/// A producer of motion samples
///
/// `start` hands out the one and only stream; production ends on `stop` or
/// when the stream is dropped.
pub trait MotionSource: Send {
    fn start(&mut self) -> Result<MotionStream, MotionError>;

    fn stop(&mut self);
}

/// Motion source configuration
#[derive(Debug, Clone)]
pub struct MotionSourceConfig {
    /// Sample rate in Hz (default: 10)
    pub sample_rate_hz: u32,
    /// Channel capacity between the sampling task and the consumer
    pub buffer: usize,
}

impl Default for MotionSourceConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 10,
            buffer: 100,
        }
    }
}

/// Receiving end of a motion source
pub struct MotionStream {
    receiver: mpsc::Receiver<MotionSample>,
}

impl MotionStream {
    /// Receive the next validated sample
    pub async fn next(&mut self) -> Option<MotionSample> {
        self.receiver.recv().await
    }
}

/// Motion source that polls a [`MotionDriver`] at a fixed rate
pub struct DriverMotionSource {
    config: MotionSourceConfig,
    driver: Option<Box<dyn MotionDriver>>,
    shutdown: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl DriverMotionSource {
    pub fn new(driver: Box<dyn MotionDriver>, config: MotionSourceConfig) -> Self {
        Self {
            config,
            driver: Some(driver),
            shutdown: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }

    /// Whether the sampling task is alive
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl MotionSource for DriverMotionSource {
    fn start(&mut self) -> Result<MotionStream, MotionError> {
        let rate = self.config.sample_rate_hz;
        if rate == 0 || rate > MAX_SAMPLE_RATE_HZ {
            return Err(MotionError::InvalidRate(rate));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| MotionError::Unavailable(e.to_string()))?;
        let mut driver = self.driver.take().ok_or(MotionError::AlreadyStarted)?;

        driver.open()?;

        let interval = Duration::from_micros(1_000_000 / self.config.sample_rate_hz as u64);
        let (tx, rx) = mpsc::channel::<MotionSample>(self.config.buffer.max(1));
        let shutdown = self.shutdown.clone();

        info!(
            "Starting motion source at {} Hz",
            self.config.sample_rate_hz
        );

        self.task = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            while !shutdown.load(Ordering::SeqCst) {
                ticker.tick().await;

                let raw = match driver.read() {
                    Ok(raw) => raw,
                    Err(e) => {
                        warn!("Motion read error: {}", e);
                        continue;
                    }
                };

                match MotionSample::try_from(raw) {
                    Ok(sample) => {
                        if tx.send(sample).await.is_err() {
                            debug!("Motion stream receiver dropped");
                            break;
                        }
                    }
                    Err(e) => {
                        metrics::counter!("motion_samples_rejected_total").increment(1);
                        warn!("Dropping motion reading: {}", e);
                    }
                }
            }
        }));

        Ok(MotionStream { receiver: rx })
    }

    fn stop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            info!("Stopping motion source");
            task.abort();
        }
    }
}

impl Drop for DriverMotionSource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays a fixed list of readings, then repeats the last one
    struct ScriptedDriver {
        readings: VecDeque<RawMotionReading>,
        last: RawMotionReading,
        fail_open: bool,
    }

    impl ScriptedDriver {
        fn new(readings: Vec<RawMotionReading>) -> Self {
            Self {
                last: RawMotionReading {
                    timestamp_ns: u64::MAX,
                    acceleration: Vector3::ZERO,
                    rotation: Vector3::ZERO,
                },
                readings: readings.into(),
                fail_open: false,
            }
        }
    }

    impl MotionDriver for ScriptedDriver {
        fn open(&mut self) -> Result<(), MotionError> {
            if self.fail_open {
                Err(MotionError::Unavailable("no gyroscope".to_string()))
            } else {
                Ok(())
            }
        }

        fn read(&mut self) -> Result<RawMotionReading, MotionError> {
            Ok(self.readings.pop_front().unwrap_or(self.last))
        }
    }

    fn reading(t: u64, ax: f64) -> RawMotionReading {
        RawMotionReading {
            timestamp_ns: t,
            acceleration: Vector3::new(ax, 0.0, 0.0),
            rotation: Vector3::ZERO,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_samples_arrive_in_order() {
        let driver = ScriptedDriver::new(vec![reading(1, 0.1), reading(2, 0.2), reading(3, 0.3)]);
        let mut source = DriverMotionSource::new(Box::new(driver), MotionSourceConfig::default());
        let mut stream = source.start().unwrap();

        for expected in 1..=3 {
            let sample = stream.next().await.unwrap();
            assert_eq!(sample.timestamp_ns(), expected);
        }
        source.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_finite_readings_are_dropped() {
        let driver = ScriptedDriver::new(vec![
            reading(1, 0.1),
            reading(2, f64::NAN),
            reading(3, f64::INFINITY),
            reading(4, 0.4),
        ]);
        let mut source = DriverMotionSource::new(Box::new(driver), MotionSourceConfig::default());
        let mut stream = source.start().unwrap();

        assert_eq!(stream.next().await.unwrap().timestamp_ns(), 1);
        assert_eq!(stream.next().await.unwrap().timestamp_ns(), 4);
        source.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_is_not_restartable() {
        let mut source = DriverMotionSource::new(
            Box::new(ScriptedDriver::new(vec![])),
            MotionSourceConfig::default(),
        );
        let _stream = source.start().unwrap();
        source.stop();

        assert_eq!(source.start().err(), Some(MotionError::AlreadyStarted));
    }

    #[tokio::test]
    async fn test_open_failure_is_surfaced() {
        let mut driver = ScriptedDriver::new(vec![]);
        driver.fail_open = true;
        let mut source = DriverMotionSource::new(Box::new(driver), MotionSourceConfig::default());

        assert!(matches!(source.start(), Err(MotionError::Unavailable(_))));
        assert!(!source.is_running());
    }

    #[tokio::test]
    async fn test_zero_rate_rejected() {
        let config = MotionSourceConfig {
            sample_rate_hz: 0,
            ..Default::default()
        };
        let mut source = DriverMotionSource::new(Box::new(ScriptedDriver::new(vec![])), config);
        assert_eq!(source.start().err(), Some(MotionError::InvalidRate(0)));
    }

    #[tokio::test]
    async fn test_rate_above_microsecond_resolution_rejected() {
        let config = MotionSourceConfig {
            sample_rate_hz: 2_000_000,
            ..Default::default()
        };
        let mut source = DriverMotionSource::new(Box::new(ScriptedDriver::new(vec![])), config);
        assert_eq!(source.start().err(), Some(MotionError::InvalidRate(2_000_000)));
        assert!(!source.is_running());
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let mut source = DriverMotionSource::new(
            Box::new(ScriptedDriver::new(vec![])),
            MotionSourceConfig::default(),
        );
        assert!(matches!(source.start(), Err(MotionError::Unavailable(_))));
    }
}
