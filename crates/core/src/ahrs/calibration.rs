//! IMU calibration data structures and estimation math
//!
//! Provides the gyro/accel bias estimate from a FIFO burst, the hardware
//! offset register encodings derived from it, and magnetometer
//! hard/soft-iron estimation from per-axis extents.
//!
//! Register access and timing live in the firmware crate's MPU-9250 driver.

use core::fmt;

/// Gyroscope sensitivity during bias estimation (LSB per °/s at ±250 °/s)
pub const GYRO_BIAS_SENSITIVITY: i32 = 131;

/// Accelerometer sensitivity during bias estimation (LSB per g at ±2 g)
pub const ACCEL_BIAS_SENSITIVITY: i32 = 16384;

/// Size of one accel + gyro FIFO frame in bytes
pub const FIFO_FRAME_LEN: usize = 12;

/// AK8963 16-bit output resolution (µT per LSB)
pub const MAG_RESOLUTION: f32 = 4912.0 / 32760.0;

/// Calibration failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError {
    /// The FIFO burst contained no complete sample frames
    NoFifoSamples,
    /// Every magnetometer sample in the window overflowed
    NoValidSamples,
    /// A magnetometer axis showed no dynamic range
    DegenerateAxis {
        /// Axis index in the magnetometer frame (0 = X, 1 = Y, 2 = Z)
        axis: usize,
    },
}

impl CalibrationError {
    /// Return variant name as a static string (usable with defmt on embedded)
    pub fn as_str(&self) -> &'static str {
        match self {
            CalibrationError::NoFifoSamples => "NoFifoSamples",
            CalibrationError::NoValidSamples => "NoValidSamples",
            CalibrationError::DegenerateAxis { .. } => "DegenerateAxis",
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationError::NoFifoSamples => write!(f, "FIFO burst produced no samples"),
            CalibrationError::NoValidSamples => write!(f, "no valid magnetometer samples"),
            CalibrationError::DegenerateAxis { axis } => {
                write!(f, "magnetometer axis {} has zero range", axis)
            }
        }
    }
}

/// Calibration constants held by the firmware
///
/// Gyro bias lives in the hardware offset registers once written; the copy
/// here is informational. Magnetometer values are applied in software to
/// every sample until replaced by a later calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationProfile {
    /// Gyroscope bias reported by the last bias estimate (°/s)
    pub gyro_bias_dps: [f32; 3],

    /// Accelerometer bias reported by the last bias estimate (g)
    pub accel_bias_g: [f32; 3],

    /// Magnetometer factory sensitivity adjustment, including the output
    /// resolution (µT per LSB)
    pub mag_sensitivity: [f32; 3],

    /// Magnetometer hard-iron bias (µT), subtracted after sensitivity scaling
    pub mag_bias: [f32; 3],

    /// Magnetometer soft-iron scale (dimensionless)
    pub mag_scale: [f32; 3],
}

impl Default for CalibrationProfile {
    /// Identity calibration: zero bias, unit scale, neutral fuse ROM values
    fn default() -> Self {
        Self {
            gyro_bias_dps: [0.0; 3],
            accel_bias_g: [0.0; 3],
            mag_sensitivity: [MAG_RESOLUTION; 3],
            mag_bias: [0.0; 3],
            mag_scale: [1.0; 3],
        }
    }
}

impl CalibrationProfile {
    /// Replace the magnetometer hard/soft-iron correction
    pub fn set_mag_correction(&mut self, correction: MagCorrection) {
        self.mag_bias = correction.bias;
        self.mag_scale = correction.scale;
    }
}

/// Convert an AK8963 fuse ROM sensitivity adjustment value to µT per LSB
///
/// ```text
/// Hadj = H * ((ASA - 128) / 256 + 1)
/// ```
pub fn mag_sensitivity_from_asa(asa: u8) -> f32 {
    ((asa as f32 - 128.0) / 256.0 + 1.0) * MAG_RESOLUTION
}

// ============================================================================
// Gyro / accel bias
// ============================================================================

/// Accumulates FIFO frames during the gyro/accel bias burst
#[derive(Debug, Clone, Copy, Default)]
pub struct FifoBiasAccumulator {
    accel_sum: [i32; 3],
    gyro_sum: [i32; 3],
    packets: i32,
}

impl FifoBiasAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one 12-byte frame (accel X/Y/Z then gyro X/Y/Z, big-endian)
    pub fn push_frame(&mut self, frame: &[u8; FIFO_FRAME_LEN]) {
        let accel = crate::sensor::raw::decode_be3(&frame[0..6]);
        let gyro = crate::sensor::raw::decode_be3(&frame[6..12]);
        for axis in 0..3 {
            self.accel_sum[axis] += accel[axis] as i32;
            self.gyro_sum[axis] += gyro[axis] as i32;
        }
        self.packets += 1;
    }

    /// Number of frames accumulated so far
    pub fn packet_count(&self) -> usize {
        self.packets as usize
    }

    /// Average the accumulated frames
    ///
    /// One gravity unit is removed from the Z accelerometer axis, with the
    /// sign chosen by the observed polarity.
    ///
    /// # Errors
    ///
    /// Returns `CalibrationError::NoFifoSamples` if no frame was accumulated.
    pub fn finish(&self) -> Result<BiasEstimate, CalibrationError> {
        if self.packets == 0 {
            return Err(CalibrationError::NoFifoSamples);
        }

        let mut accel = [0i32; 3];
        let mut gyro = [0i32; 3];
        for axis in 0..3 {
            accel[axis] = self.accel_sum[axis] / self.packets;
            gyro[axis] = self.gyro_sum[axis] / self.packets;
        }

        if accel[2] > 0 {
            accel[2] -= ACCEL_BIAS_SENSITIVITY;
        } else {
            accel[2] += ACCEL_BIAS_SENSITIVITY;
        }

        Ok(BiasEstimate {
            accel_counts: accel,
            gyro_counts: gyro,
        })
    }
}

/// Averaged at-rest bias in raw counts (±2 g / ±250 °/s ranges)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BiasEstimate {
    /// Accelerometer bias with gravity removed from Z
    pub accel_counts: [i32; 3],
    /// Gyroscope bias
    pub gyro_counts: [i32; 3],
}

impl BiasEstimate {
    /// Gyroscope bias in °/s
    pub fn gyro_dps(&self) -> [f32; 3] {
        self.gyro_counts
            .map(|counts| counts as f32 / GYRO_BIAS_SENSITIVITY as f32)
    }

    /// Accelerometer bias in g
    pub fn accel_g(&self) -> [f32; 3] {
        self.accel_counts
            .map(|counts| counts as f32 / ACCEL_BIAS_SENSITIVITY as f32)
    }

    /// Gyro offset register bytes `[XH, XL, YH, YL, ZH, ZL]`
    ///
    /// The offset registers are additive and expect 32.8 LSB per °/s, so the
    /// bias is negated and divided by 4.
    pub fn gyro_offset_registers(&self) -> [u8; 6] {
        let mut regs = [0u8; 6];
        for axis in 0..3 {
            let value = -self.gyro_counts[axis] / 4;
            regs[axis * 2] = ((value >> 8) & 0xFF) as u8;
            regs[axis * 2 + 1] = (value & 0xFF) as u8;
        }
        regs
    }

    /// Accel offset register bytes `[XH, XL, YH, YL, ZH, ZL]`
    ///
    /// The accelerometer offset registers hold factory trim at 2048 LSB/g
    /// (bits 15:1) with bit 0 reserved for temperature compensation. The
    /// reserved bit is preserved and the averaged bias, rescaled by 1/8, is
    /// subtracted from the trim.
    pub fn accel_offset_registers(&self, factory_trim: [i16; 3]) -> [u8; 6] {
        let mut regs = [0u8; 6];
        for axis in 0..3 {
            let trim = factory_trim[axis] as i32;
            let reserved = trim & 1;
            let adjusted = (((trim >> 1) - self.accel_counts[axis] / 8) << 1) | reserved;
            regs[axis * 2] = ((adjusted >> 8) & 0xFF) as u8;
            regs[axis * 2 + 1] = (adjusted & 0xFF) as u8;
        }
        regs
    }
}

// ============================================================================
// Magnetometer hard / soft iron
// ============================================================================

/// Magnetometer hard-iron bias and soft-iron scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagCorrection {
    /// Hard-iron bias (µT)
    pub bias: [f32; 3],
    /// Soft-iron scale (dimensionless)
    pub scale: [f32; 3],
}

impl Default for MagCorrection {
    fn default() -> Self {
        Self {
            bias: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

/// Running per-axis extents of valid magnetometer samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagExtents {
    min: [i16; 3],
    max: [i16; 3],
    samples: u32,
}

impl Default for MagExtents {
    fn default() -> Self {
        Self::new()
    }
}

impl MagExtents {
    /// Start with inverted extents so the first sample sets both bounds
    pub fn new() -> Self {
        Self {
            min: [i16::MAX; 3],
            max: [-i16::MAX; 3],
            samples: 0,
        }
    }

    /// Build extents directly from known bounds
    pub fn from_bounds(min: [i16; 3], max: [i16; 3]) -> Self {
        Self {
            min,
            max,
            samples: 1,
        }
    }

    /// Widen the extents with one non-overflow sample
    pub fn update(&mut self, sample: [i16; 3]) {
        for axis in 0..3 {
            self.max[axis] = self.max[axis].max(sample[axis]);
            self.min[axis] = self.min[axis].min(sample[axis]);
        }
        self.samples += 1;
    }

    /// Number of samples folded in
    pub fn sample_count(&self) -> u32 {
        self.samples
    }

    /// Per-axis half range in counts
    fn half_ranges(&self) -> Result<[i32; 3], CalibrationError> {
        if self.samples == 0 {
            return Err(CalibrationError::NoValidSamples);
        }

        let mut half = [0i32; 3];
        for axis in 0..3 {
            half[axis] = (self.max[axis] as i32 - self.min[axis] as i32) / 2;
            if half[axis] <= 0 {
                return Err(CalibrationError::DegenerateAxis { axis });
            }
        }
        Ok(half)
    }

    /// Hard-iron bias in µT: the extents midpoint scaled by the per-axis
    /// sensitivity adjustment
    pub fn hard_iron_bias(&self, sensitivity: &[f32; 3]) -> Result<[f32; 3], CalibrationError> {
        if self.samples == 0 {
            return Err(CalibrationError::NoValidSamples);
        }

        let mut bias = [0.0f32; 3];
        for axis in 0..3 {
            let center = (self.max[axis] as i32 + self.min[axis] as i32) / 2;
            bias[axis] = center as f32 * sensitivity[axis];
        }
        Ok(bias)
    }

    /// Soft-iron scale: mean half range divided by each axis's half range
    ///
    /// # Errors
    ///
    /// `DegenerateAxis` if any axis has zero half range.
    pub fn soft_iron_scale(&self) -> Result<[f32; 3], CalibrationError> {
        let half = self.half_ranges()?;
        let avg = (half[0] + half[1] + half[2]) as f32 / 3.0;
        Ok(half.map(|h| avg / h as f32))
    }

    /// Solve both corrections
    pub fn solve(&self, sensitivity: &[f32; 3]) -> Result<MagCorrection, CalibrationError> {
        let scale = self.soft_iron_scale()?;
        let bias = self.hard_iron_bias(sensitivity)?;
        Ok(MagCorrection { bias, scale })
    }
}
