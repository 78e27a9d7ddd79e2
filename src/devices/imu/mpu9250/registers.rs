//! MPU-9250 and AK8963 Register Definitions
//!
//! Based on MPU-9250 Register Map (RM-MPU-9250A-00 v1.6)
//! and AK8963 Datasheet.

use bitflags::bitflags;

// ============================================================================
// I2C Addresses
// ============================================================================

/// MPU-9250 I2C address when AD0 pin is low
pub const MPU9250_ADDR: u8 = 0x68;

/// AK8963 magnetometer I2C address (bypass mode or I2C master slave 0)
pub const AK8963_ADDR: u8 = 0x0C;

// ============================================================================
// MPU-9250 Registers
// ============================================================================

/// Gyroscope offset registers
pub const XG_OFFSET_H: u8 = 0x13;
pub const XG_OFFSET_L: u8 = 0x14;
pub const YG_OFFSET_H: u8 = 0x15;
pub const YG_OFFSET_L: u8 = 0x16;
pub const ZG_OFFSET_H: u8 = 0x17;
pub const ZG_OFFSET_L: u8 = 0x18;

/// Gyro offset registers in write order
pub const GYRO_OFFSET_REGISTERS: [u8; 6] = [
    XG_OFFSET_H,
    XG_OFFSET_L,
    YG_OFFSET_H,
    YG_OFFSET_L,
    ZG_OFFSET_H,
    ZG_OFFSET_L,
];

/// Sample rate divider: SAMPLE_RATE = Internal_Sample_Rate / (1 + SMPLRT_DIV)
pub const SMPLRT_DIV: u8 = 0x19;

/// Configuration register (DLPF, FSYNC)
pub const CONFIG: u8 = 0x1A;

/// Gyroscope configuration (full-scale range, FCHOICE_B)
pub const GYRO_CONFIG: u8 = 0x1B;

/// Accelerometer configuration (full-scale range)
pub const ACCEL_CONFIG: u8 = 0x1C;

/// Accelerometer configuration 2 (DLPF, ACCEL_FCHOICE_B)
pub const ACCEL_CONFIG_2: u8 = 0x1D;

/// FIFO enable register
pub const FIFO_EN: u8 = 0x23;

/// I2C master control
pub const I2C_MST_CTRL: u8 = 0x24;

/// I2C master clock 400 kHz (I2C_MST_CTRL[3:0])
pub const I2C_MST_CLK_400KHZ: u8 = 0x0D;

/// I2C slave 0 registers
pub const I2C_SLV0_ADDR: u8 = 0x25;
pub const I2C_SLV0_REG: u8 = 0x26;
pub const I2C_SLV0_CTRL: u8 = 0x27;

/// Slave 0 enable bit in I2C_SLV0_CTRL; the low nibble holds the byte count
pub const I2C_SLV0_EN: u8 = 0x80;

/// Slave address bit selecting a read transfer
pub const I2C_READ_FLAG: u8 = 0x80;

/// Interrupt pin configuration
pub const INT_PIN_CFG: u8 = 0x37;

/// Interrupt enable
pub const INT_ENABLE: u8 = 0x38;

/// Interrupt status; reading clears the latched bits
pub const INT_STATUS: u8 = 0x3A;

/// Accelerometer measurements (high byte first); start of the sample block
pub const ACCEL_XOUT_H: u8 = 0x3B;

/// External sensor data (from I2C slaves)
pub const EXT_SENS_DATA_00: u8 = 0x49;

/// I2C slave 0 data out
pub const I2C_SLV0_DO: u8 = 0x63;

/// User control register
pub const USER_CTRL: u8 = 0x6A;

/// Power management 1
pub const PWR_MGMT_1: u8 = 0x6B;

/// Power management 2
pub const PWR_MGMT_2: u8 = 0x6C;

/// FIFO count registers
pub const FIFO_COUNTH: u8 = 0x72;

/// FIFO read/write
pub const FIFO_R_W: u8 = 0x74;

/// Device ID
pub const WHO_AM_I: u8 = 0x75;

/// Accelerometer offset registers (factory trim)
pub const XA_OFFSET_H: u8 = 0x77;
pub const YA_OFFSET_H: u8 = 0x7A;
pub const ZA_OFFSET_H: u8 = 0x7D;

/// Accel offset register pairs, high byte address per axis
pub const ACCEL_OFFSET_REGISTERS: [u8; 3] = [XA_OFFSET_H, YA_OFFSET_H, ZA_OFFSET_H];

/// Length of the register dump starting at 0x00
pub const REGISTER_DUMP_LEN: usize = 127;

// ============================================================================
// MPU-9250 Register Values
// ============================================================================

/// WHO_AM_I values of supported parts
pub const MPU9250_WHO_AM_I_VALUE: u8 = 0x71;
pub const MPU9255_WHO_AM_I_VALUE: u8 = 0x73;

/// PWR_MGMT_1 auto clock select (PLL if ready, else internal oscillator)
pub const PWR_MGMT_1_CLKSEL_AUTO: u8 = 0x01;

bitflags! {
    /// PWR_MGMT_1 bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PwrMgmt1: u8 {
        /// Device reset; self-clearing
        const H_RESET = 1 << 7;
    }
}

bitflags! {
    /// USER_CTRL bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UserCtrl: u8 {
        const FIFO_EN = 1 << 6;
        /// Enable the auxiliary I2C master
        const I2C_MST_EN = 1 << 5;
        /// Disable the primary I2C slave interface (SPI only)
        const I2C_IF_DIS = 1 << 4;
        const FIFO_RST = 1 << 2;
    }
}

bitflags! {
    /// INT_PIN_CFG bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IntPinCfg: u8 {
        const LATCH_INT_EN = 1 << 5;
        const INT_ANYRD_2CLEAR = 1 << 4;
        /// Route the auxiliary I2C bus to the host pins
        const BYPASS_EN = 1 << 1;
    }
}

bitflags! {
    /// INT_ENABLE bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IntEnable: u8 {
        /// Raw sensor data ready interrupt to the INT pin
        const RAW_RDY_EN = 1 << 0;
    }
}

bitflags! {
    /// INT_STATUS bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IntStatus: u8 {
        const RAW_DATA_RDY_INT = 1 << 0;
    }
}

bitflags! {
    /// FIFO_EN bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FifoEn: u8 {
        const GYRO_XOUT = 1 << 6;
        const GYRO_YOUT = 1 << 5;
        const GYRO_ZOUT = 1 << 4;
        const ACCEL = 1 << 3;
    }
}

impl FifoEn {
    /// Gyro and accel into the FIFO (12 bytes per sample)
    pub const GYRO_ACCEL: FifoEn = FifoEn::GYRO_XOUT
        .union(FifoEn::GYRO_YOUT)
        .union(FifoEn::GYRO_ZOUT)
        .union(FifoEn::ACCEL);
}

/// CONFIG value used during bias estimation (188 Hz DLPF)
pub const CONFIG_DLPF_188HZ: u8 = 0x01;

// ============================================================================
// AK8963 Magnetometer Registers
// ============================================================================

/// AK8963 device ID register
pub const AK8963_WIA: u8 = 0x00;

/// AK8963 measurement data start (low byte first, unlike MPU-9250!)
pub const AK8963_HXL: u8 = 0x03;

/// HXL..HZH plus ST2
pub const AK8963_DATA_LEN: usize = 7;

/// AK8963 control register 1 (mode, output bit)
pub const AK8963_CNTL1: u8 = 0x0A;

/// AK8963 sensitivity adjustment values (read in Fuse ROM access mode)
pub const AK8963_ASAX: u8 = 0x10;

/// AK8963 WHO_AM_I expected value
pub const AK8963_WHO_AM_I_VALUE: u8 = 0x48;

/// AK8963 CNTL1 mode settings
pub const AK8963_MODE_POWER_DOWN: u8 = 0x00;
pub const AK8963_MODE_FUSE_ROM: u8 = 0x0F;

/// Continuous measurement mode 2 (100 Hz) with 16-bit output
pub const AK8963_MODE_CONT_100HZ_16BIT: u8 = 0x16;
