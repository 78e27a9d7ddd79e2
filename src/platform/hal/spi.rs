//! SPI register bus over `embedded_hal::spi::SpiDevice`

use crate::platform::{error::BusError, traits::RegisterBus, PlatformError, Result};
use embedded_hal::spi::{ErrorKind, Operation, SpiDevice};

/// Register address bit that selects a read transfer
pub const SPI_READ_FLAG: u8 = 0x80;

/// Register bus over a blocking SPI device
///
/// The device address passed to [`RegisterBus`] calls is ignored; chip
/// select identifies the sensor. Writes are not read back.
pub struct SpiRegisterBus<S> {
    spi: S,
}

impl<S: SpiDevice> SpiRegisterBus<S> {
    pub fn new(spi: S) -> Self {
        Self { spi }
    }

    pub fn release(self) -> S {
        self.spi
    }
}

fn map_error<E: embedded_hal::spi::Error>(e: E) -> PlatformError {
    let bus = match e.kind() {
        ErrorKind::Overrun => BusError::Overrun,
        _ => BusError::TransferFailed,
    };
    PlatformError::Bus(bus)
}

impl<S: SpiDevice> RegisterBus for SpiRegisterBus<S> {
    fn write_byte(&mut self, _dev: u8, reg: u8, value: u8) -> Result<()> {
        self.spi.write(&[reg & !SPI_READ_FLAG, value]).map_err(map_error)
    }

    fn read_bytes(&mut self, _dev: u8, reg: u8, buf: &mut [u8]) -> Result<()> {
        self.spi
            .transaction(&mut [
                Operation::Write(&[reg | SPI_READ_FLAG]),
                Operation::Read(buf),
            ])
            .map_err(map_error)
    }
}
