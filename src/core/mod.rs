//! Core infrastructure shared by the firmware modules

pub mod logging;
