//! Inbound command decoding

use super::{Packet, ProtocolError, PACKET_SIZE};

/// Offset of the first payload byte in an inbound frame
pub const REQUEST_HEADER_LEN: usize = 2;

/// Largest payload an inbound frame can carry
pub const MAX_REQUEST_PAYLOAD: usize = PACKET_SIZE - REQUEST_HEADER_LEN;

/// Command codes understood by the session dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandCode {
    StartStreaming = 0,
    Stop = 1,
    CalibrateMagnetometer = 2,
    DumpRegisters = 3,
}

impl CommandCode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Command name for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandCode::StartStreaming => "StartStreaming",
            CommandCode::Stop => "Stop",
            CommandCode::CalibrateMagnetometer => "CalibrateMagnetometer",
            CommandCode::DumpRegisters => "DumpRegisters",
        }
    }
}

impl TryFrom<u8> for CommandCode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CommandCode::StartStreaming),
            1 => Ok(CommandCode::Stop),
            2 => Ok(CommandCode::CalibrateMagnetometer),
            3 => Ok(CommandCode::DumpRegisters),
            other => Err(ProtocolError::UnknownCommand(other)),
        }
    }
}

/// Decoded host request: `[code, len, payload...]`
///
/// Inbound frames carry no final flag, so the payload starts at byte 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandRequest<'a> {
    pub code: CommandCode,
    pub payload: &'a [u8],
}

impl<'a> CommandRequest<'a> {
    pub fn parse(packet: &'a Packet) -> Result<Self, ProtocolError> {
        let code = CommandCode::try_from(packet.command_code())?;
        let len = packet.payload_len() as usize;
        if len > MAX_REQUEST_PAYLOAD {
            return Err(ProtocolError::InvalidLength);
        }
        let start = REQUEST_HEADER_LEN;
        let payload = &packet.as_bytes()[start..start + len];
        Ok(Self { code, payload })
    }

    /// Payload byte at `index`, if the host sent one
    pub fn arg(&self, index: usize) -> Option<u8> {
        self.payload.get(index).copied()
    }
}
