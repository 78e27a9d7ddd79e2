//! Host packet protocol
//!
//! Every frame exchanged with the host is exactly [`PACKET_SIZE`] bytes:
//!
//! | byte | meaning |
//! |------|---------|
//! | 0 | command code |
//! | 1 | payload length (0..=61) |
//! | 2 | final flag (0 = more packets follow) |
//! | 3.. | payload, zero padded |
//!
//! Host requests use the same 64-byte frame without the final flag, so
//! their payload starts at byte 2.

pub mod command;
pub mod packet;

pub use command::{CommandCode, CommandRequest, MAX_REQUEST_PAYLOAD, REQUEST_HEADER_LEN};
pub use packet::{Packet, PacketWriter, HEADER_LEN, MAX_PAYLOAD, PACKET_SIZE};

use core::fmt;

/// Packet framing and decoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// Append would exceed the 61-byte payload area
    PayloadOverflow,
    /// Command code not recognised
    UnknownCommand(u8),
    /// Declared payload length exceeds the payload area
    InvalidLength,
}

impl ProtocolError {
    /// Get error message
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolError::PayloadOverflow => "Payload overflow",
            ProtocolError::UnknownCommand(_) => "Unknown command",
            ProtocolError::InvalidLength => "Invalid payload length",
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::UnknownCommand(code) => write!(f, "Unknown command {}", code),
            other => f.write_str(other.as_str()),
        }
    }
}
