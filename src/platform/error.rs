//! Platform error types
//!
//! This module defines error types for platform operations.

use core::fmt;

/// Result type for platform operations
pub type Result<T> = core::result::Result<T, PlatformError>;

/// Platform-level errors
///
/// All bus, transport and timer implementations map their HAL-specific
/// errors to these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformError {
    /// Register bus operation failed
    Bus(BusError),
    /// Packet transport operation failed
    Transport(TransportError),
    /// Timer operation failed
    Timer(TimerError),
}

/// Register bus errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// No acknowledgment received
    Nack,
    /// Arbitration lost
    ArbitrationLost,
    /// Data overrun
    Overrun,
    /// Transfer failed for another reason
    TransferFailed,
    /// Read-back after a write did not match the written value
    VerifyMismatch {
        /// Register that was written
        reg: u8,
        /// Value written
        expected: u8,
        /// Value read back
        actual: u8,
    },
}

/// Packet transport errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// Host did not accept the packet within the timeout
    Timeout,
    /// Host is not connected
    Disconnected,
    /// Send failed for another reason
    SendFailed,
}

/// Timer-specific errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// Requested duration cannot be represented
    InvalidDuration,
}

impl PlatformError {
    /// Get error message
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformError::Bus(e) => e.as_str(),
            PlatformError::Transport(e) => e.as_str(),
            PlatformError::Timer(e) => e.as_str(),
        }
    }
}

impl BusError {
    /// Get error message
    pub fn as_str(&self) -> &'static str {
        match self {
            BusError::Nack => "Bus NACK",
            BusError::ArbitrationLost => "Bus arbitration lost",
            BusError::Overrun => "Bus overrun",
            BusError::TransferFailed => "Bus transfer failed",
            BusError::VerifyMismatch { .. } => "Register write verify mismatch",
        }
    }
}

impl TransportError {
    /// Get error message
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportError::Timeout => "Transport timeout",
            TransportError::Disconnected => "Transport disconnected",
            TransportError::SendFailed => "Transport send failed",
        }
    }
}

impl TimerError {
    /// Get error message
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerError::InvalidDuration => "Invalid timer duration",
        }
    }
}

impl From<BusError> for PlatformError {
    fn from(e: BusError) -> Self {
        PlatformError::Bus(e)
    }
}

impl From<TransportError> for PlatformError {
    fn from(e: TransportError) -> Self {
        PlatformError::Transport(e)
    }
}

impl From<TimerError> for PlatformError {
    fn from(e: TimerError) -> Self {
        PlatformError::Timer(e)
    }
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::Bus(BusError::VerifyMismatch {
                reg,
                expected,
                actual,
            }) => write!(
                f,
                "Bus error: register {:#04x} wrote {:#04x}, read back {:#04x}",
                reg, expected, actual
            ),
            PlatformError::Bus(e) => write!(f, "Bus error: {}", e.as_str()),
            PlatformError::Transport(e) => write!(f, "Transport error: {}", e.as_str()),
            PlatformError::Timer(e) => write!(f, "Timer error: {}", e.as_str()),
        }
    }
}
