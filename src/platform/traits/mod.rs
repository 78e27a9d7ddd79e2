//! Platform abstraction traits
//!
//! This module defines the traits that platform implementations must provide.

pub mod bus;
pub mod timer;
pub mod transport;

// Re-export trait interfaces
pub use bus::RegisterBus;
pub use timer::TimerInterface;
pub use transport::PacketTransport;
