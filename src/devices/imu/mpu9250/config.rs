//! MPU-9250 Configuration
//!
//! Full-scale ranges, digital low pass filter settings and the timing used
//! by the driver's blocking sequences.

use super::registers;

/// Gyroscope full scale range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GyroRange {
    /// ±250 °/s (default, highest resolution)
    #[default]
    Dps250,
    /// ±500 °/s
    Dps500,
    /// ±1000 °/s
    Dps1000,
    /// ±2000 °/s
    Dps2000,
}

impl GyroRange {
    /// Get the register value for this range (GYRO_CONFIG[4:3])
    pub fn register_value(self) -> u8 {
        match self {
            GyroRange::Dps250 => 0x00,
            GyroRange::Dps500 => 0x08,
            GyroRange::Dps1000 => 0x10,
            GyroRange::Dps2000 => 0x18,
        }
    }

    /// Full scale in °/s
    pub fn full_scale_dps(self) -> f32 {
        match self {
            GyroRange::Dps250 => 250.0,
            GyroRange::Dps500 => 500.0,
            GyroRange::Dps1000 => 1000.0,
            GyroRange::Dps2000 => 2000.0,
        }
    }
}

/// Accelerometer full scale range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccelRange {
    /// ±2 g (default)
    #[default]
    G2,
    /// ±4 g
    G4,
    /// ±8 g
    G8,
    /// ±16 g
    G16,
}

impl AccelRange {
    /// Get the register value for this range (ACCEL_CONFIG[4:3])
    pub fn register_value(self) -> u8 {
        match self {
            AccelRange::G2 => 0x00,
            AccelRange::G4 => 0x08,
            AccelRange::G8 => 0x10,
            AccelRange::G16 => 0x18,
        }
    }

    /// Full scale in g
    pub fn full_scale_g(self) -> f32 {
        match self {
            AccelRange::G2 => 2.0,
            AccelRange::G4 => 4.0,
            AccelRange::G8 => 8.0,
            AccelRange::G16 => 16.0,
        }
    }
}

/// Gyroscope digital low pass filter bandwidth
///
/// The two widest settings bypass the DLPF through FCHOICE_B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GyroDlpf {
    Bw8800Hz,
    /// Default: DLPF bypassed, 32 kHz sampling
    #[default]
    Bw3600Hz,
    Bw250Hz,
    Bw184Hz,
    Bw92Hz,
    Bw41Hz,
    Bw20Hz,
    Bw10Hz,
    Bw5Hz,
}

impl GyroDlpf {
    /// CONFIG[2:0] value
    pub fn config_value(self) -> u8 {
        match self {
            GyroDlpf::Bw8800Hz | GyroDlpf::Bw3600Hz | GyroDlpf::Bw250Hz => 0x00,
            GyroDlpf::Bw184Hz => 0x01,
            GyroDlpf::Bw92Hz => 0x02,
            GyroDlpf::Bw41Hz => 0x03,
            GyroDlpf::Bw20Hz => 0x04,
            GyroDlpf::Bw10Hz => 0x05,
            GyroDlpf::Bw5Hz => 0x06,
        }
    }

    /// FCHOICE_B bits OR'd into GYRO_CONFIG
    pub fn fchoice_b(self) -> u8 {
        match self {
            GyroDlpf::Bw8800Hz => 0x03,
            GyroDlpf::Bw3600Hz => 0x02,
            _ => 0x00,
        }
    }
}

/// Accelerometer digital low pass filter bandwidth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccelDlpf {
    /// Default: DLPF bypassed
    #[default]
    Bw1046Hz,
    Bw218Hz,
    Bw99Hz,
    Bw44Hz,
    Bw21Hz,
    Bw10Hz,
    Bw5Hz,
}

impl AccelDlpf {
    /// ACCEL_CONFIG_2 value (A_DLPF_CFG plus ACCEL_FCHOICE_B)
    pub fn register_value(self) -> u8 {
        match self {
            AccelDlpf::Bw1046Hz => 0x08,
            AccelDlpf::Bw218Hz => 0x01,
            AccelDlpf::Bw99Hz => 0x02,
            AccelDlpf::Bw44Hz => 0x03,
            AccelDlpf::Bw21Hz => 0x04,
            AccelDlpf::Bw10Hz => 0x05,
            AccelDlpf::Bw5Hz => 0x06,
        }
    }
}

/// Magnetometer hard/soft-iron calibration window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagCalibrationConfig {
    /// Wait before sampling starts, giving the operator time to start moving the board
    pub settle_ms: u32,
    /// Number of polls
    pub sample_count: u32,
    /// Delay between polls (new data every 10 ms at 100 Hz)
    pub sample_interval_ms: u32,
}

impl Default for MagCalibrationConfig {
    fn default() -> Self {
        Self {
            settle_ms: 4000,
            sample_count: 1500,
            sample_interval_ms: 12,
        }
    }
}

/// MPU-9250 driver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mpu9250Config {
    /// I2C address of the MPU-9250
    pub address: u8,

    /// I2C address of the AK8963
    pub mag_address: u8,

    /// Gyroscope full scale range
    pub gyro_range: GyroRange,

    /// Accelerometer full scale range
    pub accel_range: AccelRange,

    /// Gyroscope digital low pass filter
    pub gyro_dlpf: GyroDlpf,

    /// Accelerometer digital low pass filter
    pub accel_dlpf: AccelDlpf,

    /// FIFO accumulation window for the bias estimate (40 ms = 480 bytes)
    pub fifo_burst_ms: u32,

    /// Delay after each plain register write
    pub write_delay_ms: u32,

    /// Delay after each read-modify-write of a single bit
    pub bit_write_delay_ms: u32,

    /// Magnetometer calibration window
    pub mag_calibration: MagCalibrationConfig,

    /// Latch the data-ready interrupt and only sample once it is raised
    pub interrupts: bool,
}

impl Default for Mpu9250Config {
    fn default() -> Self {
        Self {
            address: registers::MPU9250_ADDR,
            mag_address: registers::AK8963_ADDR,
            gyro_range: GyroRange::Dps250,
            accel_range: AccelRange::G2,
            gyro_dlpf: GyroDlpf::Bw3600Hz,
            accel_dlpf: AccelDlpf::Bw1046Hz,
            fifo_burst_ms: 40,
            write_delay_ms: 1,
            bit_write_delay_ms: 10,
            mag_calibration: MagCalibrationConfig::default(),
            interrupts: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Mpu9250Config::default();
        assert_eq!(config.gyro_range, GyroRange::Dps250);
        assert_eq!(config.accel_range, AccelRange::G2);
        assert_eq!(config.address, 0x68);
        assert_eq!(config.mag_address, 0x0C);
        assert_eq!(config.mag_calibration.sample_count, 1500);
        assert!(!config.interrupts);
    }

    #[test]
    fn test_gyro_config_byte() {
        let dlpf = GyroDlpf::Bw3600Hz;
        assert_eq!(GyroRange::Dps2000.register_value() | dlpf.fchoice_b(), 0x1A);
        assert_eq!(dlpf.config_value(), 0x00);
        assert_eq!(GyroDlpf::Bw41Hz.config_value(), 0x03);
        assert_eq!(GyroDlpf::Bw41Hz.fchoice_b(), 0x00);
    }

    #[test]
    fn test_accel_dlpf_bypass() {
        assert_eq!(AccelDlpf::Bw1046Hz.register_value(), 0x08);
        assert_eq!(AccelDlpf::Bw99Hz.register_value(), 0x02);
    }

    #[test]
    fn test_full_scales() {
        assert_eq!(GyroRange::Dps500.full_scale_dps(), 500.0);
        assert_eq!(AccelRange::G16.full_scale_g(), 16.0);
    }
}
