//! AHRS (Attitude and Heading Reference System) algorithms
//!
//! Calibration math, the Madgwick and Mahony orientation filters, and the
//! timing helper that feeds them. Everything here is pure computation; the
//! register I/O that produces the inputs lives in the root crate.

pub mod calibration;
pub mod madgwick;
pub mod mahony;
pub mod state;
pub mod timing;

pub use calibration::{
    mag_sensitivity_from_asa, BiasEstimate, CalibrationError, CalibrationProfile,
    FifoBiasAccumulator, MagCorrection, MagExtents, ACCEL_BIAS_SENSITIVITY, FIFO_FRAME_LEN,
    GYRO_BIAS_SENSITIVITY, MAG_RESOLUTION,
};
pub use madgwick::MadgwickFilter;
pub use mahony::MahonyFilter;
pub use state::{
    AttitudeFilter, AttitudeState, FilterConfig, FilterGains, FilterOutcome, FusionAlgorithm,
    FusionInput, OrientationFilter, DEFAULT_INITIAL_ORIENTATION,
};
pub use timing::DeltaTimer;
