//! Fixed-size packet framing

use super::ProtocolError;

/// Size of every frame on the wire
pub const PACKET_SIZE: usize = 64;

/// Command code, payload length and final flag
pub const HEADER_LEN: usize = 3;

/// Largest payload a single packet can carry
pub const MAX_PAYLOAD: usize = PACKET_SIZE - HEADER_LEN;

/// One 64-byte frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet([u8; PACKET_SIZE]);

impl Packet {
    /// Wrap raw frame bytes as received from the transport
    pub fn from_bytes(bytes: [u8; PACKET_SIZE]) -> Self {
        Self(bytes)
    }

    /// Build a single packet from a complete payload
    pub fn with_payload(code: u8, payload: &[u8], is_final: bool) -> Result<Self, ProtocolError> {
        let mut writer = PacketWriter::start(code, is_final);
        writer.push_bytes(payload)?;
        Ok(writer.finish())
    }

    pub fn as_bytes(&self) -> &[u8; PACKET_SIZE] {
        &self.0
    }

    pub fn command_code(&self) -> u8 {
        self.0[0]
    }

    /// Declared payload length (unchecked)
    pub fn payload_len(&self) -> u8 {
        self.0[1]
    }

    pub fn is_final(&self) -> bool {
        self.0[2] != 0
    }

    /// Payload bytes, bounded by the declared length
    pub fn payload(&self) -> Result<&[u8], ProtocolError> {
        let len = self.payload_len() as usize;
        if len > MAX_PAYLOAD {
            return Err(ProtocolError::InvalidLength);
        }
        Ok(&self.0[HEADER_LEN..HEADER_LEN + len])
    }
}

/// Incremental packet builder
///
/// The payload length byte tracks what has been appended, and unused bytes
/// stay zero so every emitted frame is fully deterministic.
#[derive(Debug, Clone)]
pub struct PacketWriter {
    buf: [u8; PACKET_SIZE],
    len: usize,
}

impl PacketWriter {
    /// Start a frame for `code`
    pub fn start(code: u8, is_final: bool) -> Self {
        let mut buf = [0u8; PACKET_SIZE];
        buf[0] = code;
        buf[2] = u8::from(is_final);
        Self { buf, len: 0 }
    }

    /// Bytes still available in the payload area
    pub fn remaining(&self) -> usize {
        MAX_PAYLOAD - self.len
    }

    pub fn push_u8(&mut self, value: u8) -> Result<(), ProtocolError> {
        self.push_bytes(&[value])
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        if bytes.len() > self.remaining() {
            return Err(ProtocolError::PayloadOverflow);
        }
        let start = HEADER_LEN + self.len;
        self.buf[start..start + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        Ok(())
    }

    /// Append a little-endian IEEE-754 value
    pub fn push_f32(&mut self, value: f32) -> Result<(), ProtocolError> {
        self.push_bytes(&value.to_le_bytes())
    }

    pub fn push_f32_slice(&mut self, values: &[f32]) -> Result<(), ProtocolError> {
        if values.len() * 4 > self.remaining() {
            return Err(ProtocolError::PayloadOverflow);
        }
        for value in values {
            self.push_f32(*value)?;
        }
        Ok(())
    }

    /// Seal the frame
    pub fn finish(mut self) -> Packet {
        // len <= MAX_PAYLOAD (61) always fits in a byte
        self.buf[1] = self.len as u8;
        Packet(self.buf)
    }
}
