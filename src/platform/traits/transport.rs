//! Packet transport interface trait

use crate::platform::Result;
use imu_stream_core::protocol::Packet;

/// Fixed-size packet link to the host (USB raw HID on hardware)
pub trait PacketTransport {
    /// Send one packet, waiting at most `timeout_ms` for the host to take it
    fn send(&mut self, packet: &Packet, timeout_ms: u32) -> Result<()>;

    /// Take the next inbound packet, if one has arrived
    fn receive(&mut self) -> Option<Packet>;
}
