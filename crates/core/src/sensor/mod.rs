//! Sensor sample types
//!
//! Decoding of the MPU-9250 measurement register block and conversion of
//! raw counts into physical units.

pub mod raw;
pub mod scale;

pub use raw::{MagStatus, RawSample, SAMPLE_BLOCK_LEN};
pub use scale::{CalibratedSample, SensorScale};
