//! Mock platform implementation for testing
//!
//! This module provides mock implementations of platform traits that can be used
//! for unit testing without requiring actual hardware.
//!
//! # Feature Gate
//!
//! This module is available in two contexts:
//! - During test builds (`#[cfg(test)]`)
//! - When the `mock` feature is enabled
//!
//! # Shared handles
//!
//! Each mock is a cheap handle over shared state. Cloning a mock before
//! handing it to a driver or dispatcher lets the test keep inspecting and
//! scripting it after ownership has moved.

#![cfg(any(test, feature = "mock"))]

mod bus;
mod timer;
mod transport;

pub use bus::{MockRegisterBus, RegisterWrite};
pub use timer::MockTimer;
pub use transport::MockTransport;
