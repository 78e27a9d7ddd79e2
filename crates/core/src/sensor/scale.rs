//! Unit conversion of raw samples
//!
//! Accelerometer counts are converted to m/s², gyroscope counts to rad/s and
//! magnetometer counts to calibrated µT using the active [`CalibrationProfile`].

use crate::ahrs::CalibrationProfile;
use crate::sensor::RawSample;
use nalgebra::Vector3;

/// Standard gravity used for accelerometer scaling (m/s²)
pub const GRAVITY: f32 = 9.807;

/// Degrees to radians
pub const DEG_TO_RAD: f32 = core::f32::consts::PI / 180.0;

/// Half of the signed 16-bit output span
const FULL_SCALE_COUNTS: f32 = 32767.5;

/// Temperature sensitivity (LSB/°C)
pub const TEMP_SENSITIVITY: f32 = 333.87;

/// Temperature offset (°C)
pub const TEMP_OFFSET: f32 = 21.0;

/// Scale factors for the currently configured full-scale ranges
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorScale {
    /// m/s² per accelerometer LSB
    pub accel: f32,
    /// rad/s per gyroscope LSB
    pub gyro: f32,
}

impl SensorScale {
    /// Build scale factors from full-scale ranges
    ///
    /// # Arguments
    ///
    /// * `accel_full_scale_g` - Accelerometer range (2, 4, 8 or 16 g)
    /// * `gyro_full_scale_dps` - Gyroscope range (250, 500, 1000 or 2000 °/s)
    pub fn new(accel_full_scale_g: f32, gyro_full_scale_dps: f32) -> Self {
        Self {
            accel: GRAVITY * accel_full_scale_g / FULL_SCALE_COUNTS,
            gyro: gyro_full_scale_dps / FULL_SCALE_COUNTS * DEG_TO_RAD,
        }
    }

    /// Convert a raw sample into physical units
    ///
    /// The AK8963 axes are rotated relative to the accelerometer/gyroscope
    /// axes, so the magnetometer output is remapped as `(y, x, -z)` after
    /// hard/soft-iron correction. Bias and scale are indexed in the
    /// magnetometer's own frame.
    pub fn apply(&self, raw: &RawSample, profile: &CalibrationProfile) -> CalibratedSample {
        let accel = Vector3::new(
            raw.accel[0] as f32 * self.accel,
            raw.accel[1] as f32 * self.accel,
            raw.accel[2] as f32 * self.accel,
        );
        let gyro = Vector3::new(
            raw.gyro[0] as f32 * self.gyro,
            raw.gyro[1] as f32 * self.gyro,
            raw.gyro[2] as f32 * self.gyro,
        );

        let mag_axis = |axis: usize| {
            (raw.mag[axis] as f32 * profile.mag_sensitivity[axis] - profile.mag_bias[axis])
                * profile.mag_scale[axis]
        };
        let mag = Vector3::new(mag_axis(1), mag_axis(0), -mag_axis(2));

        CalibratedSample {
            accel,
            gyro,
            mag,
            temperature: convert_temperature(raw.temperature),
        }
    }
}

/// Convert raw temperature counts to °C
pub fn convert_temperature(raw: i16) -> f32 {
    ((raw as f32 - TEMP_OFFSET) / TEMP_SENSITIVITY) + TEMP_OFFSET
}

/// Sample in physical units, ready for fusion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibratedSample {
    /// Accelerometer (m/s²)
    pub accel: Vector3<f32>,
    /// Gyroscope (rad/s)
    pub gyro: Vector3<f32>,
    /// Magnetometer (µT), remapped to the accelerometer frame
    pub mag: Vector3<f32>,
    /// Temperature (°C)
    pub temperature: f32,
}

impl CalibratedSample {
    /// Flatten as `ax ay az gx gy gz mx my mz temp`
    pub fn to_array(&self) -> [f32; 10] {
        [
            self.accel.x,
            self.accel.y,
            self.accel.z,
            self.gyro.x,
            self.gyro.y,
            self.gyro.z,
            self.mag.x,
            self.mag.y,
            self.mag.z,
            self.temperature,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_scale_factors() {
        let scale = SensorScale::new(2.0, 250.0);
        assert!((scale.accel - 9.807 * 2.0 / 32767.5).abs() < 1e-9);
        assert!((scale.gyro - 250.0 / 32767.5 * DEG_TO_RAD).abs() < 1e-9);
    }

    #[test]
    fn test_temperature_at_offset() {
        // Raw value equal to the offset maps back onto the offset
        assert!((convert_temperature(21) - 21.0).abs() < EPSILON);
        assert!((convert_temperature(21 + 3339) - 31.001).abs() < 1e-3);
    }

    #[test]
    fn test_apply_identity_profile() {
        let scale = SensorScale::new(2.0, 250.0);
        let profile = CalibrationProfile {
            mag_sensitivity: [1.0, 1.0, 1.0],
            ..Default::default()
        };
        let raw = RawSample {
            accel: [0, 0, 16384],
            gyro: [131, 0, 0],
            mag: [10, 20, 30],
            temperature: 21,
            mag_overflow: false,
        };

        let sample = scale.apply(&raw, &profile);

        assert!((sample.accel.z - 16384.0 * scale.accel).abs() < EPSILON);
        assert!((sample.gyro.x - 131.0 * scale.gyro).abs() < EPSILON);
        // Remapped as (y, x, -z)
        assert_eq!(sample.mag, Vector3::new(20.0, 10.0, -30.0));
    }

    #[test]
    fn test_apply_hard_and_soft_iron() {
        let scale = SensorScale::new(2.0, 250.0);
        let profile = CalibrationProfile {
            mag_sensitivity: [0.5, 0.5, 0.5],
            mag_bias: [1.0, 2.0, 3.0],
            mag_scale: [2.0, 3.0, 4.0],
            ..Default::default()
        };
        let raw = RawSample {
            mag: [10, 20, 30],
            ..Default::default()
        };

        let sample = scale.apply(&raw, &profile);

        // x <- axis 1: (20 * 0.5 - 2) * 3 = 24
        // y <- axis 0: (10 * 0.5 - 1) * 2 = 8
        // z <- axis 2: -((30 * 0.5 - 3) * 4) = -48
        assert!((sample.mag.x - 24.0).abs() < EPSILON);
        assert!((sample.mag.y - 8.0).abs() < EPSILON);
        assert!((sample.mag.z + 48.0).abs() < EPSILON);
    }

    #[test]
    fn test_to_array_order() {
        let sample = CalibratedSample {
            accel: Vector3::new(1.0, 2.0, 3.0),
            gyro: Vector3::new(4.0, 5.0, 6.0),
            mag: Vector3::new(7.0, 8.0, 9.0),
            temperature: 10.0,
        };
        assert_eq!(
            sample.to_array(),
            [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]
        );
    }
}
