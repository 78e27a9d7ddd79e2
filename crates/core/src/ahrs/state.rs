//! Attitude state, filter configuration and algorithm selection

use super::{madgwick::MadgwickFilter, mahony::MahonyFilter};
use nalgebra::{Quaternion, Vector3};

/// Default starting orientation (scalar first)
///
/// Not derived from a first sample; roughly matches the board lying flat
/// with its connector facing the operator.
pub const DEFAULT_INITIAL_ORIENTATION: [f32; 4] = [0.39, 0.0, 0.0, -0.92];

/// Filter gains
///
/// Passed to the filter at session setup so that sessions and tests can use
/// different tunings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterGains {
    /// Madgwick gradient-descent gain (trust in accel/mag correction)
    pub beta: f32,
    /// Mahony proportional gain
    pub kp: f32,
    /// Mahony integral gain; zero disables and clears the integral term
    pub ki: f32,
}

impl Default for FilterGains {
    fn default() -> Self {
        Self {
            beta: 0.41,
            kp: 1.0,
            ki: 0.0,
        }
    }
}

/// Per-session filter configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterConfig {
    /// Filter gains
    pub gains: FilterGains,
    /// Quaternion the attitude state is reset to (w, x, y, z)
    pub initial_orientation: [f32; 4],
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            gains: FilterGains::default(),
            initial_orientation: DEFAULT_INITIAL_ORIENTATION,
        }
    }
}

/// Attitude estimate owned by the active streaming session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeState {
    /// Orientation quaternion (scalar first: w = q0)
    pub quaternion: Quaternion<f32>,

    /// Mahony integral error accumulator
    pub integral_error: Vector3<f32>,
}

impl AttitudeState {
    /// Create a state at the given orientation
    ///
    /// The orientation is normalised; a zero quaternion falls back to identity.
    pub fn new(orientation: [f32; 4]) -> Self {
        let [w, x, y, z] = orientation;
        let norm = libm::sqrtf(w * w + x * x + y * y + z * z);
        let quaternion = if norm > 0.0 {
            Quaternion::new(w / norm, x / norm, y / norm, z / norm)
        } else {
            Quaternion::identity()
        };

        Self {
            quaternion,
            integral_error: Vector3::zeros(),
        }
    }

    /// Quaternion components as `[q0, q1, q2, q3]`
    pub fn to_array(&self) -> [f32; 4] {
        [
            self.quaternion.w,
            self.quaternion.i,
            self.quaternion.j,
            self.quaternion.k,
        ]
    }

    /// Quaternion norm
    pub fn norm(&self) -> f32 {
        let [w, x, y, z] = self.to_array();
        libm::sqrtf(w * w + x * x + y * y + z * z)
    }
}

impl Default for AttitudeState {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_ORIENTATION)
    }
}

/// One calibrated fusion input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionInput {
    /// Accelerometer (any consistent unit; only direction is used)
    pub accel: Vector3<f32>,
    /// Gyroscope (rad/s)
    pub gyro: Vector3<f32>,
    /// Magnetometer (any consistent unit; only direction is used)
    pub mag: Vector3<f32>,
}

/// Result of a single filter update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    /// Quaternion advanced
    Updated,
    /// Zero-norm accelerometer or magnetometer; state untouched
    Skipped,
}

/// Attitude filter interface
pub trait AttitudeFilter {
    /// Advance `state` by one tick of `dt` seconds
    fn update(&self, state: &mut AttitudeState, input: &FusionInput, dt: f32) -> FilterOutcome;
}

/// Fusion algorithm selector carried in the StartStreaming request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FusionAlgorithm {
    /// Gradient-descent filter
    #[default]
    Madgwick,
    /// Proportional-integral complementary filter
    Mahony,
}

impl FusionAlgorithm {
    /// Map a wire selector to an algorithm
    pub fn from_selector(selector: u8) -> Option<Self> {
        match selector {
            0 => Some(FusionAlgorithm::Madgwick),
            1 => Some(FusionAlgorithm::Mahony),
            _ => None,
        }
    }

    /// Algorithm name for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            FusionAlgorithm::Madgwick => "Madgwick",
            FusionAlgorithm::Mahony => "Mahony",
        }
    }
}

/// Orientation filter selected for one session
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrientationFilter {
    /// Gradient-descent filter
    Madgwick(MadgwickFilter),
    /// PI complementary filter
    Mahony(MahonyFilter),
}

impl OrientationFilter {
    /// Build the filter for `algorithm` with the given gains
    pub fn new(algorithm: FusionAlgorithm, gains: &FilterGains) -> Self {
        match algorithm {
            FusionAlgorithm::Madgwick => OrientationFilter::Madgwick(MadgwickFilter::new(gains.beta)),
            FusionAlgorithm::Mahony => OrientationFilter::Mahony(MahonyFilter::new(gains.kp, gains.ki)),
        }
    }

    /// Which algorithm this filter runs
    pub fn algorithm(&self) -> FusionAlgorithm {
        match self {
            OrientationFilter::Madgwick(_) => FusionAlgorithm::Madgwick,
            OrientationFilter::Mahony(_) => FusionAlgorithm::Mahony,
        }
    }
}

impl AttitudeFilter for OrientationFilter {
    fn update(&self, state: &mut AttitudeState, input: &FusionInput, dt: f32) -> FilterOutcome {
        match self {
            OrientationFilter::Madgwick(filter) => filter.update(state, input, dt),
            OrientationFilter::Mahony(filter) => filter.update(state, input, dt),
        }
    }
}

/// Normalise a vector, returning `None` for a zero norm
pub(crate) fn normalized(v: &Vector3<f32>) -> Option<Vector3<f32>> {
    let norm = libm::sqrtf(v.x * v.x + v.y * v.y + v.z * v.z);
    if norm == 0.0 {
        return None;
    }
    let inv = 1.0 / norm;
    Some(Vector3::new(v.x * inv, v.y * inv, v.z * inv))
}

/// Normalise and store a quaternion given as components
pub(crate) fn store_normalized(state: &mut AttitudeState, q0: f32, q1: f32, q2: f32, q3: f32) {
    let norm = libm::sqrtf(q0 * q0 + q1 * q1 + q2 * q2 + q3 * q3);
    if norm == 0.0 {
        return;
    }
    let inv = 1.0 / norm;
    state.quaternion = Quaternion::new(q0 * inv, q1 * inv, q2 * inv, q3 * inv);
}
