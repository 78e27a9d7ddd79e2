//! IMU drivers
//!
//! ## Available Drivers
//!
//! - `mpu9250`: MPU-9250 with the AK8963 magnetometer

use crate::platform::PlatformError;
use core::fmt;
use imu_stream_core::ahrs::CalibrationError;

pub mod mpu9250;

pub use mpu9250::{GyroAccelBias, Mpu9250, Mpu9250Config};

/// IMU driver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImuError {
    /// Register bus or timer failure
    Bus(PlatformError),
    /// Calibration could not produce a result
    Calibration(CalibrationError),
    /// Device ID register held an unexpected value
    UnexpectedDevice(u8),
}

impl ImuError {
    /// Return variant name as a static string (usable with defmt on embedded)
    pub fn as_str(&self) -> &'static str {
        match self {
            ImuError::Bus(e) => e.as_str(),
            ImuError::Calibration(e) => e.as_str(),
            ImuError::UnexpectedDevice(_) => "UnexpectedDevice",
        }
    }
}

impl fmt::Display for ImuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImuError::Bus(e) => write!(f, "{}", e),
            ImuError::Calibration(e) => write!(f, "Calibration error: {}", e),
            ImuError::UnexpectedDevice(id) => write!(f, "Unexpected device ID {:#04x}", id),
        }
    }
}

impl From<PlatformError> for ImuError {
    fn from(error: PlatformError) -> Self {
        ImuError::Bus(error)
    }
}

impl From<CalibrationError> for ImuError {
    fn from(error: CalibrationError) -> Self {
        ImuError::Calibration(error)
    }
}
