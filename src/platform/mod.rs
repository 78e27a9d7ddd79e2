//! Platform abstraction layer
//!
//! Traits for the register bus, the host packet link and the timer, with
//! `embedded-hal` adapters for real hardware and in-memory mocks for tests.
//! Sensor drivers and the session dispatcher only ever see these traits.

pub mod error;
pub mod hal;
pub mod traits;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export commonly used types
pub use error::{BusError, PlatformError, Result, TimerError, TransportError};
pub use traits::{PacketTransport, RegisterBus, TimerInterface};
