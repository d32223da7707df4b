//! Tick accumulation across counter overflows
//!
//! The hardware counter is only a few bits wide. [`TickAccumulator`] extends
//! it to 32 bits: every overflow notification adds one full counter range,
//! and the final partial count is folded in when the echo ends.

use core::cell::Cell;

use critical_section::Mutex;

use crate::traits::HardwareCounter;

/// Elapsed ticks for the current measurement
///
/// Written by the overflow handler and the falling-edge handler, read by the
/// main loop only once the measurement is flagged complete.
pub struct TickAccumulator {
    ticks: Mutex<Cell<u32>>,
}

impl Default for TickAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl TickAccumulator {
    /// Create an accumulator holding zero ticks
    pub const fn new() -> Self {
        Self {
            ticks: Mutex::new(Cell::new(0)),
        }
    }

    /// Clear the accumulated ticks and the hardware count
    pub fn reset<C: HardwareCounter>(&self, counter: &C) {
        critical_section::with(|cs| {
            self.ticks.borrow(cs).set(0);
            counter.clear();
        });
    }

    /// Account for one counter wraparound
    ///
    /// Called from the overflow interrupt. Saturates instead of wrapping so
    /// a runaway echo can never alias to a short distance.
    pub fn on_overflow<C: HardwareCounter>(&self) {
        critical_section::with(|cs| {
            let ticks = self.ticks.borrow(cs);
            ticks.set(ticks.get().saturating_add(C::RANGE));
        });
    }

    /// Fold the current hardware count in and clear the counter
    ///
    /// Called once per measurement, from the falling-edge handler.
    pub fn finalize<C: HardwareCounter>(&self, counter: &C) {
        critical_section::with(|cs| {
            let partial = counter.value();
            counter.clear();
            let ticks = self.ticks.borrow(cs);
            ticks.set(ticks.get().saturating_add(partial));
        });
    }

    /// Accumulated ticks
    pub fn ticks(&self) -> u32 {
        critical_section::with(|cs| self.ticks.borrow(cs).get())
    }
}
