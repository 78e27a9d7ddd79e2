//! Device drivers
//!
//! Drivers are written against the platform traits only, so the same code
//! runs on a HAL-backed bus and on the in-memory mocks.

pub mod imu;
