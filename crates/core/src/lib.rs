//! imu_stream_core - Pure no_std algorithms for the imu_stream firmware
//!
//! This crate contains the platform-agnostic parts of the firmware that
//! can be tested on host without any feature flags or hardware.
//!
//! # Design Principles
//!
//! - **Zero cfg**: No `#[cfg(feature = ...)]` directives allowed
//! - **Pure no_std**: No std library dependencies
//! - **No I/O**: Register access, timing and transport live in the firmware crate
//!
//! # Modules
//!
//! - [`sensor`]: Raw register block decoding and unit scaling
//! - [`ahrs`]: Calibration math, attitude state and the Madgwick/Mahony filters
//! - [`protocol`]: 64-byte packet framing and command codes

#![no_std]

pub mod ahrs;
pub mod protocol;
pub mod sensor;
