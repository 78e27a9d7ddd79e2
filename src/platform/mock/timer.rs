//! Mock Timer implementation for testing

use crate::platform::{traits::TimerInterface, Result};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::vec::Vec;

/// Mock Timer implementation
///
/// Uses simulated time: delays advance the clock instantly, so blocking
/// calibration windows complete immediately in tests. Clones share the
/// same clock.
#[derive(Debug, Clone, Default)]
pub struct MockTimer {
    now_us: Rc<Cell<u64>>,
    delays_us: Rc<RefCell<Vec<u32>>>,
}

impl MockTimer {
    /// Create a new mock timer at t = 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward without recording a delay
    pub fn advance_us(&self, us: u64) {
        self.now_us.set(self.now_us.get().wrapping_add(us));
    }

    /// Every delay requested so far, in microseconds
    pub fn delays_us(&self) -> Vec<u32> {
        self.delays_us.borrow().clone()
    }

    /// Sum of all requested delays, in microseconds
    pub fn total_delay_us(&self) -> u64 {
        self.delays_us.borrow().iter().map(|&d| d as u64).sum()
    }

    /// Forget recorded delays
    pub fn clear_delays(&self) {
        self.delays_us.borrow_mut().clear();
    }
}

impl TimerInterface for MockTimer {
    fn delay_us(&mut self, us: u32) -> Result<()> {
        self.delays_us.borrow_mut().push(us);
        self.advance_us(us as u64);
        Ok(())
    }

    fn now_us(&self) -> u64 {
        self.now_us.get()
    }
}
