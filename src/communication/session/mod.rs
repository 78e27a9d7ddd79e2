//! Command sessions
//!
//! Exactly one command is active at a time. The host selects it with an
//! inbound frame; the [`Dispatcher`] runs its setup once and then calls its
//! execute step on every tick until the command reports that it is done or
//! another request replaces it.
//!
//! # Lifecycle
//!
//! ```text
//! Idle -> Setup -> Running -> Stopped
//!                     \-> (replaced by the next request)
//! ```

pub mod command;
pub mod dispatcher;

pub use command::{Command, Execution, StreamingSession, MAX_PACKETS_PER_TICK};
pub use dispatcher::{ActiveSession, Dispatcher, DispatcherConfig};

use crate::devices::imu::ImuError;
use crate::platform::PlatformError;
use core::fmt;
use imu_stream_core::protocol::ProtocolError;

/// Phase of the active session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No command received yet
    #[default]
    Idle,
    /// Setup in progress
    Setup,
    /// Execute runs on every tick
    Running,
    /// Finished, or setup/execute failed
    Stopped,
}

/// Session errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// Sensor setup, read or calibration failed
    Device(ImuError),
    /// Malformed request or response frame
    Protocol(ProtocolError),
    /// Transport or timer failure in the dispatcher loop
    Transport(PlatformError),
}

impl SessionError {
    /// Return variant name as a static string (usable with defmt on embedded)
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionError::Device(e) => e.as_str(),
            SessionError::Protocol(e) => e.as_str(),
            SessionError::Transport(e) => e.as_str(),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Device(e) => write!(f, "Device error: {}", e),
            SessionError::Protocol(e) => write!(f, "Protocol error: {}", e),
            SessionError::Transport(e) => write!(f, "{}", e),
        }
    }
}

impl From<ImuError> for SessionError {
    fn from(error: ImuError) -> Self {
        SessionError::Device(error)
    }
}

impl From<ProtocolError> for SessionError {
    fn from(error: ProtocolError) -> Self {
        SessionError::Protocol(error)
    }
}

impl From<PlatformError> for SessionError {
    fn from(error: PlatformError) -> Self {
        SessionError::Transport(error)
    }
}
