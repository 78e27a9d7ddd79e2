//! MPU-9250 9-axis IMU driver
//!
//! Register access over any [`RegisterBus`](crate::platform::RegisterBus),
//! device setup, gyro/accel bias estimation and AK8963 magnetometer access
//! in both I2C master and bypass mode.

pub mod calibration;
pub mod config;
pub mod driver;
pub mod magnetometer;
pub mod registers;

pub use calibration::GyroAccelBias;
pub use config::{AccelDlpf, AccelRange, GyroDlpf, GyroRange, MagCalibrationConfig, Mpu9250Config};
pub use driver::Mpu9250;
pub use magnetometer::MagReading;
