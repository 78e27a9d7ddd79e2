//! Mahony proportional-integral complementary filter

use nalgebra::Vector3;

use super::state::{
    normalized, store_normalized, AttitudeFilter, AttitudeState, FilterOutcome, FusionInput,
};

/// Proportional/integral feedback gains
///
/// All four quaternion derivatives are taken from the pre-update quaternion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MahonyFilter {
    pub kp: f32,
    /// Integral gain; the accumulated error is cleared while this is not positive
    pub ki: f32,
}

impl MahonyFilter {
    pub fn new(kp: f32, ki: f32) -> Self {
        Self { kp, ki }
    }
}

impl AttitudeFilter for MahonyFilter {
    fn update(&self, state: &mut AttitudeState, input: &FusionInput, dt: f32) -> FilterOutcome {
        let Some(a) = normalized(&input.accel) else {
            return FilterOutcome::Skipped;
        };
        let Some(m) = normalized(&input.mag) else {
            return FilterOutcome::Skipped;
        };

        let q = state.quaternion;
        let (q0, q1, q2, q3) = (q.w, q.i, q.j, q.k);
        let q0q0 = q0 * q0;
        let q0q1 = q0 * q1;
        let q0q2 = q0 * q2;
        let q0q3 = q0 * q3;
        let q1q1 = q1 * q1;
        let q1q2 = q1 * q2;
        let q1q3 = q1 * q3;
        let q2q2 = q2 * q2;
        let q2q3 = q2 * q3;
        let q3q3 = q3 * q3;

        // Earth field reference, rotated into the horizontal plane
        let hx = 2.0 * m.x * (0.5 - q2q2 - q3q3)
            + 2.0 * m.y * (q1q2 - q0q3)
            + 2.0 * m.z * (q1q3 + q0q2);
        let hy = 2.0 * m.x * (q1q2 + q0q3)
            + 2.0 * m.y * (0.5 - q1q1 - q3q3)
            + 2.0 * m.z * (q2q3 - q0q1);
        let bx = libm::sqrtf(hx * hx + hy * hy);
        let bz = 2.0 * m.x * (q1q3 - q0q2)
            + 2.0 * m.y * (q2q3 + q0q1)
            + 2.0 * m.z * (0.5 - q1q1 - q2q2);

        // Estimated gravity and field directions in the body frame
        let v = Vector3::new(
            2.0 * (q1q3 - q0q2),
            2.0 * (q0q1 + q2q3),
            q0q0 - q1q1 - q2q2 + q3q3,
        );
        let w = Vector3::new(
            2.0 * bx * (0.5 - q2q2 - q3q3) + 2.0 * bz * (q1q3 - q0q2),
            2.0 * bx * (q1q2 - q0q3) + 2.0 * bz * (q0q1 + q2q3),
            2.0 * bx * (q0q2 + q1q3) + 2.0 * bz * (0.5 - q1q1 - q2q2),
        );

        let error = a.cross(&v) + m.cross(&w);
        if self.ki > 0.0 {
            state.integral_error += error;
        } else {
            state.integral_error = Vector3::zeros();
        }

        let g = input.gyro + error * self.kp + state.integral_error * self.ki;
        let half_dt = 0.5 * dt;

        store_normalized(
            state,
            q0 + (-q1 * g.x - q2 * g.y - q3 * g.z) * half_dt,
            q1 + (q0 * g.x + q2 * g.z - q3 * g.y) * half_dt,
            q2 + (q0 * g.y - q1 * g.z + q3 * g.x) * half_dt,
            q3 + (q0 * g.z + q1 * g.y - q2 * g.x) * half_dt,
        );
        FilterOutcome::Updated
    }
}
