//! Madgwick gradient-descent orientation filter
//!
//! Fuses accelerometer, gyroscope and magnetometer samples into a quaternion
//! by taking one normalised gradient-descent step on the accel/mag objective
//! function per update and blending it with the integrated gyroscope rate.

use super::state::{
    normalized, store_normalized, AttitudeFilter, AttitudeState, FilterOutcome, FusionInput,
};

/// Gradient-descent filter parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MadgwickFilter {
    /// Corrective step gain (typically 0.1 to 0.6)
    pub beta: f32,
}

impl MadgwickFilter {
    pub fn new(beta: f32) -> Self {
        Self { beta }
    }
}

impl AttitudeFilter for MadgwickFilter {
    fn update(&self, state: &mut AttitudeState, input: &FusionInput, dt: f32) -> FilterOutcome {
        let Some(a) = normalized(&input.accel) else {
            return FilterOutcome::Skipped;
        };
        let Some(m) = normalized(&input.mag) else {
            return FilterOutcome::Skipped;
        };
        let (ax, ay, az) = (a.x, a.y, a.z);
        let (mx, my, mz) = (m.x, m.y, m.z);
        let (gx, gy, gz) = (input.gyro.x, input.gyro.y, input.gyro.z);

        let q = state.quaternion;
        let (q0, q1, q2, q3) = (q.w, q.i, q.j, q.k);

        let two_q0 = 2.0 * q0;
        let two_q1 = 2.0 * q1;
        let two_q2 = 2.0 * q2;
        let two_q3 = 2.0 * q3;
        let two_q0q2 = 2.0 * q0 * q2;
        let two_q2q3 = 2.0 * q2 * q3;
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

        // Reference direction of Earth's magnetic field
        let two_q0mx = 2.0 * q0 * mx;
        let two_q0my = 2.0 * q0 * my;
        let two_q0mz = 2.0 * q0 * mz;
        let two_q1mx = 2.0 * q1 * mx;
        let hx = mx * q0q0 - two_q0my * q3 + two_q0mz * q2 + mx * q1q1 + two_q1 * my * q2
            + two_q1 * mz * q3
            - mx * q2q2
            - mx * q3q3;
        let hy = two_q0mx * q3 + my * q0q0 - two_q0mz * q1 + two_q1mx * q2 - my * q1q1
            + my * q2q2
            + two_q2 * mz * q3
            - my * q3q3;
        let two_bx = libm::sqrtf(hx * hx + hy * hy);
        let two_bz = -two_q0mx * q2 + two_q0my * q1 + mz * q0q0 + two_q1mx * q3 - mz * q1q1
            + two_q2 * my * q3
            - mz * q2q2
            + mz * q3q3;
        let four_bx = 2.0 * two_bx;
        let four_bz = 2.0 * two_bz;

        // Objective function residuals
        let f_ax = 2.0 * q1q3 - two_q0q2 - ax;
        let f_ay = 2.0 * q0q1 + two_q2q3 - ay;
        let f_az = 1.0 - 2.0 * q1q1 - 2.0 * q2q2 - az;
        let f_mx = two_bx * (0.5 - q2q2 - q3q3) + two_bz * (q1q3 - q0q2) - mx;
        let f_my = two_bx * (q1q2 - q0q3) + two_bz * (q0q1 + q2q3) - my;
        let f_mz = two_bx * (q0q2 + q1q3) + two_bz * (0.5 - q1q1 - q2q2) - mz;

        // Gradient (Jacobian transpose times residuals)
        let s0 = -two_q2 * f_ax + two_q1 * f_ay - two_bz * q2 * f_mx
            + (-two_bx * q3 + two_bz * q1) * f_my
            + two_bx * q2 * f_mz;
        let s1 = two_q3 * f_ax + two_q0 * f_ay - 4.0 * q1 * f_az
            + two_bz * q3 * f_mx
            + (two_bx * q2 + two_bz * q0) * f_my
            + (two_bx * q3 - four_bz * q1) * f_mz;
        let s2 = -two_q0 * f_ax + two_q3 * f_ay - 4.0 * q2 * f_az
            + (-four_bx * q2 - two_bz * q0) * f_mx
            + (two_bx * q1 + two_bz * q3) * f_my
            + (two_bx * q0 - four_bz * q2) * f_mz;
        let s3 = two_q1 * f_ax + two_q2 * f_ay
            + (-four_bx * q3 + two_bz * q1) * f_mx
            + (-two_bx * q0 + two_bz * q2) * f_my
            + two_bx * q1 * f_mz;

        // Gyro-only integration if already at the objective minimum
        let step_norm = libm::sqrtf(s0 * s0 + s1 * s1 + s2 * s2 + s3 * s3);
        let (s0, s1, s2, s3) = if step_norm > 0.0 {
            let inv = 1.0 / step_norm;
            (s0 * inv, s1 * inv, s2 * inv, s3 * inv)
        } else {
            (0.0, 0.0, 0.0, 0.0)
        };

        let q_dot0 = 0.5 * (-q1 * gx - q2 * gy - q3 * gz) - self.beta * s0;
        let q_dot1 = 0.5 * (q0 * gx + q2 * gz - q3 * gy) - self.beta * s1;
        let q_dot2 = 0.5 * (q0 * gy - q1 * gz + q3 * gx) - self.beta * s2;
        let q_dot3 = 0.5 * (q0 * gz + q1 * gy - q2 * gx) - self.beta * s3;

        store_normalized(
            state,
            q0 + q_dot0 * dt,
            q1 + q_dot1 * dt,
            q2 + q_dot2 * dt,
            q3 + q_dot3 * dt,
        );
        FilterOutcome::Updated
    }
}
