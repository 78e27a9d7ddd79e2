//! Raw sample decoding
//!
//! The MPU-9250 exposes accelerometer, temperature and gyroscope output
//! registers followed by the external sensor data registers. When the
//! I2C master is configured to mirror the AK8963 measurement block, a single
//! 21-byte burst read starting at `ACCEL_XOUT_H` returns everything:
//!
//! ```text
//! offset  0..6   accel X/Y/Z   big-endian
//! offset  6..8   temperature   big-endian
//! offset  8..14  gyro X/Y/Z    big-endian
//! offset 14..20  mag X/Y/Z     little-endian (AK8963 HXL..HZH)
//! offset 20      AK8963 ST2
//! ```

use bitflags::bitflags;

/// Length of the combined measurement block
pub const SAMPLE_BLOCK_LEN: usize = 21;

/// Offset of the magnetometer data within the block
const MAG_OFFSET: usize = 14;

/// Offset of the AK8963 ST2 register within the block
const ST2_OFFSET: usize = 20;

bitflags! {
    /// AK8963 status 2 register (ST2)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MagStatus: u8 {
        /// Magnetic sensor overflow
        const HOFL = 0x08;
        /// Output bit setting mirror (1 = 16-bit output)
        const BITM = 0x10;
    }
}

impl MagStatus {
    /// Returns true if the measurement saturated
    pub fn is_overflow(self) -> bool {
        self.contains(MagStatus::HOFL)
    }
}

/// One raw register sample, exactly as read from the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawSample {
    /// Accelerometer counts (X, Y, Z)
    pub accel: [i16; 3],
    /// Gyroscope counts (X, Y, Z)
    pub gyro: [i16; 3],
    /// Magnetometer counts (X, Y, Z), zeroed when `mag_overflow` is set
    pub mag: [i16; 3],
    /// Die temperature counts
    pub temperature: i16,
    /// Magnetometer overflow flag from ST2
    pub mag_overflow: bool,
}

impl RawSample {
    /// Decode the 21-byte measurement block
    ///
    /// If the ST2 overflow bit is set, the magnetometer triplet is replaced
    /// with zeros; the raw magnetometer bytes are ignored.
    pub fn from_block(block: &[u8; SAMPLE_BLOCK_LEN]) -> Self {
        let status = MagStatus::from_bits_retain(block[ST2_OFFSET]);
        let mag_overflow = status.is_overflow();
        let mag = if mag_overflow {
            [0, 0, 0]
        } else {
            decode_le3(&block[MAG_OFFSET..MAG_OFFSET + 6])
        };

        Self {
            accel: decode_be3(&block[0..6]),
            temperature: i16::from_be_bytes([block[6], block[7]]),
            gyro: decode_be3(&block[8..14]),
            mag,
            mag_overflow,
        }
    }
}

/// Decode three big-endian i16 values
pub fn decode_be3(bytes: &[u8]) -> [i16; 3] {
    [
        i16::from_be_bytes([bytes[0], bytes[1]]),
        i16::from_be_bytes([bytes[2], bytes[3]]),
        i16::from_be_bytes([bytes[4], bytes[5]]),
    ]
}

/// Decode three little-endian i16 values
pub fn decode_le3(bytes: &[u8]) -> [i16; 3] {
    [
        i16::from_le_bytes([bytes[0], bytes[1]]),
        i16::from_le_bytes([bytes[2], bytes[3]]),
        i16::from_le_bytes([bytes[4], bytes[5]]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_with(mag: [u8; 6], st2: u8) -> [u8; SAMPLE_BLOCK_LEN] {
        let mut block = [0u8; SAMPLE_BLOCK_LEN];
        // accel X = 0x0102, Y = -2, Z = 16384
        block[0..6].copy_from_slice(&[0x01, 0x02, 0xFF, 0xFE, 0x40, 0x00]);
        // temperature = 0x0A0B
        block[6..8].copy_from_slice(&[0x0A, 0x0B]);
        // gyro X = 1, Y = -1, Z = 0x7FFF
        block[8..14].copy_from_slice(&[0x00, 0x01, 0xFF, 0xFF, 0x7F, 0xFF]);
        block[14..20].copy_from_slice(&mag);
        block[20] = st2;
        block
    }

    #[test]
    fn test_decode_big_endian_fields() {
        let sample = RawSample::from_block(&block_with([0; 6], 0x10));

        assert_eq!(sample.accel, [0x0102, -2, 16384]);
        assert_eq!(sample.temperature, 0x0A0B);
        assert_eq!(sample.gyro, [1, -1, i16::MAX]);
        assert!(!sample.mag_overflow);
    }

    #[test]
    fn test_decode_magnetometer_little_endian() {
        let sample = RawSample::from_block(&block_with([0x34, 0x12, 0xFE, 0xFF, 0x00, 0x80], 0x10));
        assert_eq!(sample.mag, [0x1234, -2, i16::MIN]);
    }

    #[test]
    fn test_overflow_zeroes_magnetometer() {
        let sample = RawSample::from_block(&block_with([0x34, 0x12, 0xFE, 0xFF, 0x00, 0x80], 0x18));

        assert!(sample.mag_overflow);
        assert_eq!(sample.mag, [0, 0, 0]);
        // Other channels are still decoded
        assert_eq!(sample.accel, [0x0102, -2, 16384]);
    }

    #[test]
    fn test_overflow_ignores_any_mag_bytes() {
        for fill in [0x00u8, 0x55, 0xAA, 0xFF] {
            let sample = RawSample::from_block(&block_with([fill; 6], MagStatus::HOFL.bits()));
            assert_eq!(sample.mag, [0, 0, 0]);
        }
    }
}
