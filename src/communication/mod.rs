//! Host communication
//!
//! The host drives the firmware with 64-byte request frames and receives
//! 64-byte response frames. Frame layout and command codes live in
//! `imu_stream_core::protocol`; this module runs the commands.

pub mod session;
