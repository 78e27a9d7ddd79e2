//! Mock packet transport implementation for testing

use crate::platform::{error::TransportError, traits::PacketTransport, PlatformError, Result};
use imu_stream_core::protocol::Packet;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

#[derive(Debug, Default)]
struct TransportState {
    inbound: VecDeque<Packet>,
    sent: Vec<Packet>,
    timeouts_ms: Vec<u32>,
    fault: Option<TransportError>,
}

/// Mock host link
///
/// Inbound packets are scripted with [`MockTransport::push_inbound`];
/// outbound packets are recorded.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Rc<RefCell<TransportState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a packet for the firmware to receive
    pub fn push_inbound(&self, packet: Packet) {
        self.state.borrow_mut().inbound.push_back(packet);
    }

    /// Packets sent so far
    pub fn sent(&self) -> Vec<Packet> {
        self.state.borrow().sent.clone()
    }

    /// Timeout passed with each send
    pub fn send_timeouts_ms(&self) -> Vec<u32> {
        self.state.borrow().timeouts_ms.clone()
    }

    /// Forget sent packets
    pub fn clear_sent(&self) {
        let mut state = self.state.borrow_mut();
        state.sent.clear();
        state.timeouts_ms.clear();
    }

    /// Fail subsequent sends with `fault` (or clear with `None`)
    pub fn set_fault(&self, fault: Option<TransportError>) {
        self.state.borrow_mut().fault = fault;
    }
}

impl PacketTransport for MockTransport {
    fn send(&mut self, packet: &Packet, timeout_ms: u32) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if let Some(fault) = state.fault {
            return Err(PlatformError::Transport(fault));
        }
        state.sent.push(*packet);
        state.timeouts_ms.push(timeout_ms);
        Ok(())
    }

    fn receive(&mut self) -> Option<Packet> {
        self.state.borrow_mut().inbound.pop_front()
    }
}
