//! `embedded-hal` 1.0 register bus adapters
//!
//! Any HAL that implements the blocking `embedded-hal` I2C or SPI traits
//! can drive the sensor through these adapters.

mod i2c;
mod spi;

pub use i2c::{I2cRegisterBus, DEFAULT_WRITE_SETTLE_MS};
pub use spi::{SpiRegisterBus, SPI_READ_FLAG};
