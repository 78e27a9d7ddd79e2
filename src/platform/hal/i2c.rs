//! I2C register bus over `embedded_hal::i2c::I2c`

use crate::platform::{error::BusError, traits::RegisterBus, PlatformError, Result};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, I2c};

/// Time the device needs after a register write before it reads back
pub const DEFAULT_WRITE_SETTLE_MS: u32 = 10;

/// Register bus over a blocking I2C peripheral
///
/// Every write is followed by a settle delay and a read-back of the same
/// register; a differing value is reported as
/// [`BusError::VerifyMismatch`].
pub struct I2cRegisterBus<I, D> {
    i2c: I,
    delay: D,
    settle_ms: u32,
}

impl<I: I2c, D: DelayNs> I2cRegisterBus<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self::with_settle_ms(i2c, delay, DEFAULT_WRITE_SETTLE_MS)
    }

    /// Adapter with a custom post-write settle delay
    pub fn with_settle_ms(i2c: I, delay: D, settle_ms: u32) -> Self {
        Self {
            i2c,
            delay,
            settle_ms,
        }
    }

    /// Release the underlying peripheral and delay
    pub fn release(self) -> (I, D) {
        (self.i2c, self.delay)
    }
}

fn map_error<E: embedded_hal::i2c::Error>(e: E) -> PlatformError {
    let bus = match e.kind() {
        ErrorKind::NoAcknowledge(_) => BusError::Nack,
        ErrorKind::ArbitrationLoss => BusError::ArbitrationLost,
        ErrorKind::Overrun => BusError::Overrun,
        _ => BusError::TransferFailed,
    };
    PlatformError::Bus(bus)
}

impl<I: I2c, D: DelayNs> RegisterBus for I2cRegisterBus<I, D> {
    fn write_byte(&mut self, dev: u8, reg: u8, value: u8) -> Result<()> {
        self.i2c.write(dev, &[reg, value]).map_err(map_error)?;
        self.delay.delay_ms(self.settle_ms);

        let actual = self.read_byte(dev, reg)?;
        if actual != value {
            return Err(PlatformError::Bus(BusError::VerifyMismatch {
                reg,
                expected: value,
                actual,
            }));
        }
        Ok(())
    }

    fn read_bytes(&mut self, dev: u8, reg: u8, buf: &mut [u8]) -> Result<()> {
        self.i2c.write_read(dev, &[reg], buf).map_err(map_error)
    }
}
