//! Mock register bus implementation for testing

use crate::platform::{error::BusError, traits::RegisterBus, PlatformError, Result};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::vec::Vec;

/// One recorded register write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWrite {
    pub dev: u8,
    pub reg: u8,
    pub value: u8,
}

#[derive(Debug, Default)]
struct BusState {
    registers: HashMap<(u8, u8), u8>,
    frames: HashMap<(u8, u8), VecDeque<Vec<u8>>>,
    writes: Vec<RegisterWrite>,
    verify_failures: HashSet<(u8, u8)>,
    fault: Option<BusError>,
    begun: bool,
}

impl BusState {
    fn register(&self, dev: u8, reg: u8) -> u8 {
        self.registers.get(&(dev, reg)).copied().unwrap_or(0)
    }
}

/// Mock register bus
///
/// Holds a register file per device address. Burst reads return
/// consecutive registers unless a frame has been queued for the start
/// register, in which case the queued frame is consumed instead; that is
/// how FIFO drains and repeated magnetometer polls are scripted.
#[derive(Debug, Clone, Default)]
pub struct MockRegisterBus {
    state: Rc<RefCell<BusState>>,
}

impl MockRegisterBus {
    /// Create a mock bus with every register reading zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload one register
    pub fn set_register(&self, dev: u8, reg: u8, value: u8) {
        self.state.borrow_mut().registers.insert((dev, reg), value);
    }

    /// Preload consecutive registers starting at `start`
    pub fn set_registers(&self, dev: u8, start: u8, values: &[u8]) {
        let mut state = self.state.borrow_mut();
        for (i, value) in values.iter().enumerate() {
            state
                .registers
                .insert((dev, start.wrapping_add(i as u8)), *value);
        }
    }

    /// Current value of a register
    pub fn register(&self, dev: u8, reg: u8) -> u8 {
        self.state.borrow().register(dev, reg)
    }

    /// Queue a frame returned by the next burst read starting at `reg`
    pub fn queue_read(&self, dev: u8, reg: u8, frame: &[u8]) {
        self.state
            .borrow_mut()
            .frames
            .entry((dev, reg))
            .or_default()
            .push_back(frame.to_vec());
    }

    /// Number of frames still queued for `reg`
    pub fn queued_reads(&self, dev: u8, reg: u8) -> usize {
        self.state
            .borrow()
            .frames
            .get(&(dev, reg))
            .map_or(0, VecDeque::len)
    }

    /// Make writes to this register fail read-back verification
    pub fn fail_verify(&self, dev: u8, reg: u8) {
        self.state.borrow_mut().verify_failures.insert((dev, reg));
    }

    /// Fail every subsequent transfer with `fault` (or clear with `None`)
    pub fn set_fault(&self, fault: Option<BusError>) {
        self.state.borrow_mut().fault = fault;
    }

    /// All writes in order
    pub fn writes(&self) -> Vec<RegisterWrite> {
        self.state.borrow().writes.clone()
    }

    /// Values written to one register, in order
    pub fn writes_to(&self, dev: u8, reg: u8) -> Vec<u8> {
        self.state
            .borrow()
            .writes
            .iter()
            .filter(|w| w.dev == dev && w.reg == reg)
            .map(|w| w.value)
            .collect()
    }

    /// Clear the write log
    pub fn clear_writes(&self) {
        self.state.borrow_mut().writes.clear();
    }

    /// Whether `begin` has been called (and `end` has not)
    pub fn is_begun(&self) -> bool {
        self.state.borrow().begun
    }

    fn check_fault(&self) -> Result<()> {
        match self.state.borrow().fault {
            Some(fault) => Err(PlatformError::Bus(fault)),
            None => Ok(()),
        }
    }
}

impl RegisterBus for MockRegisterBus {
    fn begin(&mut self) -> Result<()> {
        self.state.borrow_mut().begun = true;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.state.borrow_mut().begun = false;
        Ok(())
    }

    fn write_byte(&mut self, dev: u8, reg: u8, value: u8) -> Result<()> {
        self.check_fault()?;
        let mut state = self.state.borrow_mut();
        state.writes.push(RegisterWrite { dev, reg, value });

        if state.verify_failures.contains(&(dev, reg)) {
            let actual = state.register(dev, reg);
            return Err(PlatformError::Bus(BusError::VerifyMismatch {
                reg,
                expected: value,
                actual,
            }));
        }
        state.registers.insert((dev, reg), value);
        Ok(())
    }

    fn read_bytes(&mut self, dev: u8, reg: u8, buf: &mut [u8]) -> Result<()> {
        self.check_fault()?;
        let mut state = self.state.borrow_mut();

        let frame = state
            .frames
            .get_mut(&(dev, reg))
            .and_then(VecDeque::pop_front);
        match frame {
            Some(frame) => {
                buf.fill(0);
                let n = buf.len().min(frame.len());
                buf[..n].copy_from_slice(&frame[..n]);
            }
            None => {
                for (i, byte) in buf.iter_mut().enumerate() {
                    *byte = state.register(dev, reg.wrapping_add(i as u8));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_back() {
        let mut bus = MockRegisterBus::new();
        bus.write_byte(0x68, 0x6B, 0x01).unwrap();

        assert_eq!(bus.read_byte(0x68, 0x6B).unwrap(), 0x01);
        assert_eq!(bus.read_byte(0x0C, 0x6B).unwrap(), 0x00);
        assert_eq!(
            bus.writes(),
            vec![RegisterWrite {
                dev: 0x68,
                reg: 0x6B,
                value: 0x01
            }]
        );
    }

    #[test]
    fn test_burst_read_consecutive_registers() {
        let mut bus = MockRegisterBus::new();
        bus.set_registers(0x68, 0x3B, &[1, 2, 3, 4]);

        let mut buf = [0u8; 5];
        bus.read_bytes(0x68, 0x3B, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4, 0]);
    }

    #[test]
    fn test_queued_frames_take_priority() {
        let mut bus = MockRegisterBus::new();
        bus.set_register(0x68, 0x74, 0xFF);
        bus.queue_read(0x68, 0x74, &[0xAA, 0xBB]);

        let mut buf = [0u8; 3];
        bus.read_bytes(0x68, 0x74, &mut buf).unwrap();
        assert_eq!(buf, [0xAA, 0xBB, 0x00]);
        assert_eq!(bus.queued_reads(0x68, 0x74), 0);

        bus.read_bytes(0x68, 0x74, &mut buf).unwrap();
        assert_eq!(buf, [0xFF, 0x00, 0x00]);
    }

    #[test]
    fn test_verify_failure_keeps_old_value() {
        let mut bus = MockRegisterBus::new();
        bus.set_register(0x68, 0x6A, 0x10);
        bus.fail_verify(0x68, 0x6A);

        let result = bus.write_byte(0x68, 0x6A, 0x30);
        assert_eq!(
            result,
            Err(PlatformError::Bus(BusError::VerifyMismatch {
                reg: 0x6A,
                expected: 0x30,
                actual: 0x10
            }))
        );
        assert_eq!(bus.writes_to(0x68, 0x6A), vec![0x30]);
    }

    #[test]
    fn test_fault_and_shared_handle() {
        let bus = MockRegisterBus::new();
        let mut owned = bus.clone();

        bus.set_fault(Some(BusError::Nack));
        assert_eq!(
            owned.read_byte(0x68, 0x00),
            Err(PlatformError::Bus(BusError::Nack))
        );

        bus.set_fault(None);
        owned.begin().unwrap();
        assert!(bus.is_begun());
    }
}
