//! Register bus interface trait
//!
//! This module defines the byte-register access that sensor drivers are
//! written against. Implementations exist for I2C and SPI (see
//! [`crate::platform::hal`]) and for host tests (see `platform::mock`).

use crate::platform::Result;

/// Register-oriented bus
///
/// Every device on the bus is addressed by a 7-bit device address and an
/// 8-bit register address. SPI implementations ignore the device address
/// because chip select identifies the device.
///
/// # Invariants
///
/// - `begin` must be called before the first transfer
/// - Only one owner per bus instance
/// - All calls block until the transfer completes
pub trait RegisterBus {
    /// Bring up the bus
    fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    /// Release the bus and its pins
    fn end(&mut self) -> Result<()> {
        Ok(())
    }

    /// Read one register
    fn read_byte(&mut self, dev: u8, reg: u8) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_bytes(dev, reg, &mut buf)?;
        Ok(buf[0])
    }

    /// Write one register
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Bus(BusError::VerifyMismatch { .. })` when the
    /// implementation reads the register back and it does not hold `value`.
    /// The write itself has still been performed; the caller decides whether
    /// that matters.
    fn write_byte(&mut self, dev: u8, reg: u8, value: u8) -> Result<()>;

    /// Burst read `buf.len()` consecutive registers starting at `reg`
    fn read_bytes(&mut self, dev: u8, reg: u8, buf: &mut [u8]) -> Result<()>;
}
