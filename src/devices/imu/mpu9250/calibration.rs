//! Gyroscope / accelerometer bias estimation
//!
//! The device is reset to the most sensitive ranges and lets the FIFO fill
//! with accel+gyro frames for a short burst. The averaged frames give the
//! at-rest bias, which is pushed into the gyro offset registers.

use super::driver::Mpu9250;
use super::registers::{self, FifoEn, PwrMgmt1, UserCtrl};
use crate::devices::imu::ImuError;
use crate::platform::{RegisterBus, TimerInterface};
use imu_stream_core::ahrs::{FifoBiasAccumulator, FIFO_FRAME_LEN};

/// Settle delay between calibration phases (ms)
const SETTLE_MS: u32 = 20;

/// Result of one gyro/accel bias run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GyroAccelBias {
    /// Gyroscope bias (°/s)
    pub gyro_dps: [f32; 3],
    /// Accelerometer bias with gravity removed from Z (g)
    pub accel_g: [f32; 3],
    /// Bytes written to `XG_OFFSET_H..ZG_OFFSET_L`
    pub gyro_offset_registers: [u8; 6],
    /// Bytes computed for `XA_OFFSET_H..ZA_OFFSET_L`, not written
    pub accel_offset_registers: [u8; 6],
}

impl<B: RegisterBus> Mpu9250<B> {
    /// Estimate gyro/accel bias from a FIFO burst and load the gyro offsets
    ///
    /// The device must be at rest with Z roughly aligned to gravity. Leaves
    /// the device reset with FIFO and interrupts disabled; range settings
    /// must be reapplied afterwards.
    ///
    /// # Errors
    ///
    /// `CalibrationError::NoFifoSamples` when the FIFO holds no complete
    /// frame after the burst window.
    pub fn calibrate_gyro_accel<T: TimerInterface>(
        &mut self,
        timer: &mut T,
    ) -> Result<GyroAccelBias, ImuError> {
        self.write_register_bits(timer, registers::PWR_MGMT_1, PwrMgmt1::H_RESET.bits(), true)?;
        timer.delay_ms(SETTLE_MS)?;

        self.write_register(timer, registers::PWR_MGMT_1, registers::PWR_MGMT_1_CLKSEL_AUTO)?;
        self.write_register(timer, registers::PWR_MGMT_2, 0x00)?;
        timer.delay_ms(SETTLE_MS)?;

        // Bias-only configuration
        self.write_register(timer, registers::INT_ENABLE, 0x00)?;
        self.write_register(timer, registers::FIFO_EN, 0x00)?;
        self.write_register(timer, registers::PWR_MGMT_1, 0x00)?;
        self.write_register(timer, registers::I2C_MST_CTRL, 0x00)?;
        self.write_register(timer, registers::USER_CTRL, 0x00)?;
        self.write_register(timer, registers::USER_CTRL, UserCtrl::FIFO_RST.bits())?;
        timer.delay_ms(SETTLE_MS)?;

        self.write_register(timer, registers::CONFIG, registers::CONFIG_DLPF_188HZ)?;
        self.write_register(timer, registers::SMPLRT_DIV, 0x00)?;
        self.write_register(timer, registers::GYRO_CONFIG, 0x00)?;
        self.write_register(timer, registers::ACCEL_CONFIG, 0x00)?;

        // Burst
        self.write_register(timer, registers::USER_CTRL, UserCtrl::FIFO_EN.bits())?;
        self.write_register(timer, registers::FIFO_EN, FifoEn::GYRO_ACCEL.bits())?;
        let burst_ms = self.config.fifo_burst_ms;
        timer.delay_ms(burst_ms)?;
        self.write_register(timer, registers::FIFO_EN, 0x00)?;

        let mut count = [0u8; 2];
        self.read_registers(registers::FIFO_COUNTH, &mut count)?;
        let fifo_bytes = u16::from_be_bytes(count) as usize;
        let packets = fifo_bytes / FIFO_FRAME_LEN;
        crate::log_debug!("FIFO burst: {} bytes, {} frames", fifo_bytes, packets);

        let mut accumulator = FifoBiasAccumulator::new();
        for _ in 0..packets {
            let mut frame = [0u8; FIFO_FRAME_LEN];
            self.read_registers(registers::FIFO_R_W, &mut frame)?;
            accumulator.push_frame(&frame);
        }
        let estimate = accumulator.finish()?;

        let gyro_offset_registers = estimate.gyro_offset_registers();
        for (reg, value) in registers::GYRO_OFFSET_REGISTERS
            .iter()
            .zip(gyro_offset_registers.iter())
        {
            self.write_register(timer, *reg, *value)?;
        }

        // Accel offsets are computed against the factory trim but left unwritten
        let mut factory_trim = [0i16; 3];
        for (trim, reg) in factory_trim
            .iter_mut()
            .zip(registers::ACCEL_OFFSET_REGISTERS.iter())
        {
            let mut raw = [0u8; 2];
            self.read_registers(*reg, &mut raw)?;
            *trim = i16::from_be_bytes(raw);
        }
        let accel_offset_registers = estimate.accel_offset_registers(factory_trim);

        self.write_register(timer, registers::INT_ENABLE, 0x00)?;
        self.write_register(timer, registers::FIFO_EN, 0x00)?;
        self.write_register(timer, registers::USER_CTRL, 0x00)?;
        self.write_register(timer, registers::USER_CTRL, UserCtrl::FIFO_RST.bits())?;
        timer.delay_ms(SETTLE_MS)?;

        let bias = GyroAccelBias {
            gyro_dps: estimate.gyro_dps(),
            accel_g: estimate.accel_g(),
            gyro_offset_registers,
            accel_offset_registers,
        };
        self.profile.gyro_bias_dps = bias.gyro_dps;
        self.profile.accel_bias_g = bias.accel_g;
        Ok(bias)
    }
}
