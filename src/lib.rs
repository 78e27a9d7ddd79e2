#![cfg_attr(not(any(test, feature = "mock")), no_std)]

//! imu_stream - MPU-9250 calibration, orientation fusion and packet streaming
//!
//! This library provides the platform abstraction, the MPU-9250/AK8963
//! driver with its calibration sequences, and the session dispatcher that
//! serves host commands. Pure algorithms live in `imu_stream_core`.

// Platform abstraction layer (register bus, packet transport, timer)
pub mod platform;

// Device drivers using platform abstraction
pub mod devices;

// Core infrastructure (logging)
pub mod core;

// Host command sessions
pub mod communication;
