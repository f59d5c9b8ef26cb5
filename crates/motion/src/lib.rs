//! Motion Sensing
//!
//! Timestamped acceleration/rotation samples and the sources that produce
//! them. Hardware enters through [`MotionDriver`]; every reading is validated
//! at the source boundary so downstream consumers only ever see finite values.

mod error;
mod sample;
mod source;
mod synthetic;

pub use error::MotionError;
pub use sample::{MotionSample, Vector3};
pub use source::{
    DriverMotionSource, MotionDriver, MotionSource, MotionSourceConfig, MotionStream,
    RawMotionReading, MAX_SAMPLE_RATE_HZ,
};
pub use synthetic::{CrashTrigger, SyntheticDriver};
