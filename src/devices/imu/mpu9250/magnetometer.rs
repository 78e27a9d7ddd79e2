//! AK8963 magnetometer access
//!
//! The AK8963 sits behind the MPU-9250. In master mode it is reached through
//! the slave 0 channel: the MPU-9250 performs the transfer and mirrors the
//! result into `EXT_SENS_DATA_00..`. In bypass mode the AK8963 answers on the
//! host bus at its own address.

use super::driver::{tolerate_verify, Mpu9250};
use super::registers;
use crate::devices::imu::ImuError;
use crate::platform::{RegisterBus, TimerInterface};
use imu_stream_core::ahrs::{mag_sensitivity_from_asa, MagCorrection, MagExtents};
use imu_stream_core::sensor::raw::decode_le3;
use imu_stream_core::sensor::MagStatus;

/// Time for the master to fill the external sensor registers (µs)
const MASTER_READ_DELAY_US: u32 = 100;

/// Delay between power-down and continuous mode (ms)
const MODE_CHANGE_DELAY_MS: u32 = 100;

/// One AK8963 measurement block: HXL..HZH and ST2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagReading {
    pub counts: [i16; 3],
    pub status: MagStatus,
}

impl MagReading {
    fn from_block(block: &[u8; registers::AK8963_DATA_LEN]) -> Self {
        Self {
            counts: decode_le3(&block[0..6]),
            status: MagStatus::from_bits_retain(block[6]),
        }
    }

    pub fn is_overflow(&self) -> bool {
        self.status.is_overflow()
    }
}

impl<B: RegisterBus> Mpu9250<B> {
    // ------------------------------------------------------------------
    // Master mode (slave 0)
    // ------------------------------------------------------------------

    /// Read AK8963 registers through the slave 0 channel
    pub fn read_mag_registers_master<T: TimerInterface>(
        &mut self,
        timer: &mut T,
        reg: u8,
        buf: &mut [u8],
    ) -> Result<(), ImuError> {
        let mag_address = self.config.mag_address;
        self.write_register(
            timer,
            registers::I2C_SLV0_ADDR,
            mag_address | registers::I2C_READ_FLAG,
        )?;
        self.write_register(timer, registers::I2C_SLV0_REG, reg)?;
        self.write_register(
            timer,
            registers::I2C_SLV0_CTRL,
            registers::I2C_SLV0_EN | buf.len() as u8,
        )?;
        timer.delay_us(MASTER_READ_DELAY_US)?;
        self.read_registers(registers::EXT_SENS_DATA_00, buf)
    }

    /// Write one AK8963 register through the slave 0 channel
    ///
    /// Returns whether the value read back through the master matched.
    pub fn write_mag_register_master<T: TimerInterface>(
        &mut self,
        timer: &mut T,
        reg: u8,
        value: u8,
    ) -> Result<bool, ImuError> {
        let mag_address = self.config.mag_address;
        self.write_register(timer, registers::I2C_SLV0_ADDR, mag_address)?;
        self.write_register(timer, registers::I2C_SLV0_REG, reg)?;
        self.write_register(timer, registers::I2C_SLV0_DO, value)?;
        self.write_register(timer, registers::I2C_SLV0_CTRL, registers::I2C_SLV0_EN | 1)?;

        let mut readback = [0u8; 1];
        self.read_mag_registers_master(timer, reg, &mut readback)?;
        if readback[0] != value {
            crate::log_warn!(
                "AK8963 register {:#x} wrote {:#x}, read {:#x}",
                reg,
                value,
                readback[0]
            );
            return Ok(false);
        }
        Ok(true)
    }

    /// Initialise the AK8963 through the I2C master
    ///
    /// Reads the fuse ROM sensitivity adjustment into the calibration
    /// profile, selects continuous 100 Hz 16-bit mode and arms slave 0 to
    /// mirror the measurement block on every sample.
    pub fn ak8963_setup_master<T: TimerInterface>(
        &mut self,
        timer: &mut T,
    ) -> Result<(), ImuError> {
        self.write_mag_register_master(
            timer,
            registers::AK8963_CNTL1,
            registers::AK8963_MODE_POWER_DOWN,
        )?;
        self.write_mag_register_master(
            timer,
            registers::AK8963_CNTL1,
            registers::AK8963_MODE_FUSE_ROM,
        )?;

        let mut asa = [0u8; 3];
        self.read_mag_registers_master(timer, registers::AK8963_ASAX, &mut asa)?;
        self.store_sensitivity(asa);

        self.write_mag_register_master(
            timer,
            registers::AK8963_CNTL1,
            registers::AK8963_MODE_POWER_DOWN,
        )?;
        timer.delay_ms(MODE_CHANGE_DELAY_MS)?;
        self.write_mag_register_master(
            timer,
            registers::AK8963_CNTL1,
            registers::AK8963_MODE_CONT_100HZ_16BIT,
        )?;

        // Leaves slave 0 reading HXL..ST2 continuously
        let mut block = [0u8; registers::AK8963_DATA_LEN];
        self.read_mag_registers_master(timer, registers::AK8963_HXL, &mut block)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Bypass mode (direct)
    // ------------------------------------------------------------------

    fn write_mag_register_direct<T: TimerInterface>(
        &mut self,
        timer: &mut T,
        reg: u8,
        value: u8,
    ) -> Result<(), ImuError> {
        tolerate_verify(self.bus.write_byte(self.config.mag_address, reg, value))?;
        let delay_ms = self.config.write_delay_ms;
        timer.delay_ms(delay_ms)?;
        Ok(())
    }

    /// Check the AK8963 device ID (bypass mode only)
    pub fn probe_magnetometer(&mut self) -> Result<u8, ImuError> {
        let wia = self
            .bus
            .read_byte(self.config.mag_address, registers::AK8963_WIA)?;
        if wia != registers::AK8963_WHO_AM_I_VALUE {
            crate::log_error!("Unknown magnetometer WIA: {:#x}", wia);
            return Err(ImuError::UnexpectedDevice(wia));
        }
        Ok(wia)
    }

    /// Initialise the AK8963 on the host bus (requires bypass mode)
    pub fn ak8963_setup_direct<T: TimerInterface>(
        &mut self,
        timer: &mut T,
    ) -> Result<(), ImuError> {
        self.write_mag_register_direct(
            timer,
            registers::AK8963_CNTL1,
            registers::AK8963_MODE_POWER_DOWN,
        )?;
        self.write_mag_register_direct(
            timer,
            registers::AK8963_CNTL1,
            registers::AK8963_MODE_FUSE_ROM,
        )?;

        let mut asa = [0u8; 3];
        self.bus
            .read_bytes(self.config.mag_address, registers::AK8963_ASAX, &mut asa)?;
        self.store_sensitivity(asa);

        self.write_mag_register_direct(
            timer,
            registers::AK8963_CNTL1,
            registers::AK8963_MODE_POWER_DOWN,
        )?;
        self.write_mag_register_direct(
            timer,
            registers::AK8963_CNTL1,
            registers::AK8963_MODE_CONT_100HZ_16BIT,
        )?;
        crate::log_debug!("AK8963 in continuous mode");
        Ok(())
    }

    /// Read one measurement block directly (requires bypass mode)
    ///
    /// Reading through ST2 releases the data-ready latch for the next
    /// measurement.
    pub fn read_mag_direct(&mut self) -> Result<MagReading, ImuError> {
        let mut block = [0u8; registers::AK8963_DATA_LEN];
        self.bus
            .read_bytes(self.config.mag_address, registers::AK8963_HXL, &mut block)?;
        Ok(MagReading::from_block(&block))
    }

    /// Solve hard/soft-iron correction from a rotation window
    ///
    /// The device must be in bypass mode with the AK8963 in continuous mode
    /// (see [`Mpu9250::to_bypass_mode`] and [`Mpu9250::ak8963_setup_direct`]).
    /// Blocks for the settle delay plus the whole sampling window while the
    /// device is rotated through every orientation. On success the result
    /// replaces the correction in the calibration profile.
    pub fn calibrate_magnetometer<T: TimerInterface>(
        &mut self,
        timer: &mut T,
    ) -> Result<MagCorrection, ImuError> {
        let window = self.config.mag_calibration;
        crate::log_info!(
            "Magnetometer calibration: {} samples, rotate the device",
            window.sample_count
        );
        timer.delay_ms(window.settle_ms)?;

        let mut extents = MagExtents::new();
        for _ in 0..window.sample_count {
            let reading = self.read_mag_direct()?;
            if !reading.is_overflow() {
                extents.update(reading.counts);
            }
            timer.delay_ms(window.sample_interval_ms)?;
        }

        crate::log_debug!(
            "Magnetometer window: {} of {} samples valid",
            extents.sample_count(),
            window.sample_count
        );
        let correction = extents.solve(&self.profile.mag_sensitivity)?;
        self.profile.set_mag_correction(correction);
        crate::log_info!(
            "Magnetometer bias: [{}, {}, {}] uT",
            correction.bias[0],
            correction.bias[1],
            correction.bias[2]
        );
        Ok(correction)
    }

    fn store_sensitivity(&mut self, asa: [u8; 3]) {
        self.profile.mag_sensitivity = asa.map(mag_sensitivity_from_asa);
        crate::log_debug!("AK8963 ASA: [{}, {}, {}]", asa[0], asa[1], asa[2]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::imu::mpu9250::{MagCalibrationConfig, Mpu9250Config};
    use crate::platform::mock::{MockRegisterBus, MockTimer};
    use imu_stream_core::ahrs::{CalibrationError, MAG_RESOLUTION};

    const ADDR: u8 = registers::MPU9250_ADDR;
    const MAG: u8 = registers::AK8963_ADDR;
    const EPSILON: f32 = 1e-5;

    fn short_window() -> Mpu9250Config {
        Mpu9250Config {
            mag_calibration: MagCalibrationConfig {
                settle_ms: 10,
                sample_count: 4,
                sample_interval_ms: 12,
            },
            ..Mpu9250Config::default()
        }
    }

    fn block(counts: [i16; 3], st2: u8) -> [u8; registers::AK8963_DATA_LEN] {
        let mut block = [0u8; registers::AK8963_DATA_LEN];
        for axis in 0..3 {
            block[axis * 2..axis * 2 + 2].copy_from_slice(&counts[axis].to_le_bytes());
        }
        block[6] = st2;
        block
    }

    #[test]
    fn test_master_read_programs_slave0() {
        let bus = MockRegisterBus::new();
        let mut timer = MockTimer::new();
        let mut imu = Mpu9250::new(bus.clone(), Mpu9250Config::default()).unwrap();
        bus.set_registers(ADDR, registers::EXT_SENS_DATA_00, &[0x11, 0x22, 0x33]);

        let mut buf = [0u8; 3];
        imu.read_mag_registers_master(&mut timer, registers::AK8963_ASAX, &mut buf)
            .unwrap();

        assert_eq!(buf, [0x11, 0x22, 0x33]);
        assert_eq!(bus.register(ADDR, registers::I2C_SLV0_ADDR), 0x8C);
        assert_eq!(bus.register(ADDR, registers::I2C_SLV0_REG), 0x10);
        assert_eq!(bus.register(ADDR, registers::I2C_SLV0_CTRL), 0x83);
        assert!(timer.delays_us().contains(&100));
    }

    #[test]
    fn test_master_write_reports_readback() {
        let bus = MockRegisterBus::new();
        let mut timer = MockTimer::new();
        let mut imu = Mpu9250::new(bus.clone(), Mpu9250Config::default()).unwrap();

        bus.set_register(ADDR, registers::EXT_SENS_DATA_00, 0x16);
        assert!(imu
            .write_mag_register_master(&mut timer, registers::AK8963_CNTL1, 0x16)
            .unwrap());
        assert_eq!(bus.writes_to(ADDR, registers::I2C_SLV0_DO), vec![0x16]);

        assert!(!imu
            .write_mag_register_master(&mut timer, registers::AK8963_CNTL1, 0x0F)
            .unwrap());
    }

    #[test]
    fn test_setup_master_reads_sensitivity() {
        let bus = MockRegisterBus::new();
        let mut timer = MockTimer::new();
        let mut imu = Mpu9250::new(bus.clone(), Mpu9250Config::default()).unwrap();
        bus.queue_read(ADDR, registers::EXT_SENS_DATA_00, &[0x00]);
        bus.queue_read(ADDR, registers::EXT_SENS_DATA_00, &[0x0F]);
        bus.queue_read(ADDR, registers::EXT_SENS_DATA_00, &[128, 192, 64]);

        imu.ak8963_setup_master(&mut timer).unwrap();

        let sensitivity = imu.profile().mag_sensitivity;
        assert!((sensitivity[0] - MAG_RESOLUTION).abs() < EPSILON);
        assert!((sensitivity[1] - 1.25 * MAG_RESOLUTION).abs() < EPSILON);
        assert!((sensitivity[2] - 0.75 * MAG_RESOLUTION).abs() < EPSILON);
        assert_eq!(
            bus.writes_to(ADDR, registers::I2C_SLV0_DO),
            vec![0x00, 0x0F, 0x00, 0x16]
        );
        // Slave 0 left mirroring the 7-byte measurement block
        assert_eq!(bus.register(ADDR, registers::I2C_SLV0_REG), registers::AK8963_HXL);
        assert_eq!(bus.register(ADDR, registers::I2C_SLV0_CTRL), 0x87);
    }

    #[test]
    fn test_setup_direct_writes_modes() {
        let bus = MockRegisterBus::new();
        let mut timer = MockTimer::new();
        let mut imu = Mpu9250::new(bus.clone(), Mpu9250Config::default()).unwrap();
        bus.set_registers(MAG, registers::AK8963_ASAX, &[128, 128, 128]);

        imu.ak8963_setup_direct(&mut timer).unwrap();

        assert_eq!(
            bus.writes_to(MAG, registers::AK8963_CNTL1),
            vec![0x00, 0x0F, 0x00, 0x16]
        );
        assert_eq!(imu.profile().mag_sensitivity, [MAG_RESOLUTION; 3]);
    }

    #[test]
    fn test_probe_magnetometer() {
        let bus = MockRegisterBus::new();
        let mut imu = Mpu9250::new(bus.clone(), Mpu9250Config::default()).unwrap();

        assert_eq!(imu.probe_magnetometer(), Err(ImuError::UnexpectedDevice(0)));
        bus.set_register(MAG, registers::AK8963_WIA, 0x48);
        assert_eq!(imu.probe_magnetometer(), Ok(0x48));
    }

    #[test]
    fn test_calibrate_skips_overflow_samples() {
        let bus = MockRegisterBus::new();
        let mut timer = MockTimer::new();
        let mut imu = Mpu9250::new(bus.clone(), short_window()).unwrap();
        imu.profile.mag_sensitivity = [1.0; 3];
        bus.queue_read(MAG, registers::AK8963_HXL, &block([-100, -50, -20], 0x10));
        bus.queue_read(MAG, registers::AK8963_HXL, &block([30000, 30000, 30000], 0x18));
        bus.queue_read(MAG, registers::AK8963_HXL, &block([300, 150, 40], 0x10));
        bus.queue_read(MAG, registers::AK8963_HXL, &block([0, 0, 0], 0x10));

        let correction = imu.calibrate_magnetometer(&mut timer).unwrap();

        // Bias is the truncated midpoint: (300 - 100) / 2, (150 - 50) / 2, (40 - 20) / 2
        assert_eq!(correction.bias, [100.0, 50.0, 10.0]);
        // Half ranges 200, 100, 30 average to 110
        assert!((correction.scale[0] - 110.0 / 200.0).abs() < EPSILON);
        assert!((correction.scale[1] - 110.0 / 100.0).abs() < EPSILON);
        assert!((correction.scale[2] - 110.0 / 30.0).abs() < EPSILON);
        assert_eq!(imu.profile().mag_bias, correction.bias);
        assert_eq!(imu.profile().mag_scale, correction.scale);

        // Settle delay, then one interval per sample
        assert_eq!(timer.total_delay_us(), 10_000 + 4 * 12_000);
    }

    #[test]
    fn test_calibrate_all_overflow_keeps_profile() {
        let bus = MockRegisterBus::new();
        let mut timer = MockTimer::new();
        let mut imu = Mpu9250::new(bus.clone(), short_window()).unwrap();
        bus.set_registers(MAG, registers::AK8963_HXL, &block([1, 2, 3], 0x08));
        let before = *imu.profile();

        let result = imu.calibrate_magnetometer(&mut timer);

        assert_eq!(
            result,
            Err(ImuError::Calibration(CalibrationError::NoValidSamples))
        );
        assert_eq!(*imu.profile(), before);
    }

    #[test]
    fn test_calibrate_flat_axis_is_degenerate() {
        let bus = MockRegisterBus::new();
        let mut timer = MockTimer::new();
        let mut imu = Mpu9250::new(bus.clone(), short_window()).unwrap();
        bus.set_registers(MAG, registers::AK8963_HXL, &block([0, 0, 7], 0x10));
        bus.queue_read(MAG, registers::AK8963_HXL, &block([-100, -50, 7], 0x10));
        bus.queue_read(MAG, registers::AK8963_HXL, &block([100, 50, 7], 0x10));

        let result = imu.calibrate_magnetometer(&mut timer);

        assert_eq!(
            result,
            Err(ImuError::Calibration(CalibrationError::DegenerateAxis { axis: 2 }))
        );
    }
}
