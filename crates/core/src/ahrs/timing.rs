//! Filter tick timing

/// Tracks the time between consecutive filter ticks
///
/// Timestamps are microseconds from a free-running `u32` counter, so the
/// elapsed time is computed with wrapping subtraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaTimer {
    prev_us: u32,
}

impl DeltaTimer {
    /// Start timing from `now_us`
    pub fn new(now_us: u32) -> Self {
        Self { prev_us: now_us }
    }

    /// Seconds since the previous call (or since construction)
    pub fn update(&mut self, now_us: u32) -> f32 {
        let elapsed = now_us.wrapping_sub(self.prev_us);
        self.prev_us = now_us;
        elapsed as f32 * 1e-6
    }

    /// Timestamp of the previous tick
    pub fn last_us(&self) -> u32 {
        self.prev_us
    }
}
