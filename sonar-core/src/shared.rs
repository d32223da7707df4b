//! State shared between the main loop and the interrupt handlers
//!
//! There is exactly one sensor and one timer, so there is exactly one of
//! these. Firmware keeps it in a `static`; host tests create one locally and
//! lend it to the simulated handlers.

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::Mutex;

use crate::timer::TickAccumulator;

/// Measurement and backlight state touched from interrupt context
///
/// Mutual exclusion is by interrupt masking only. Nothing in here blocks.
pub struct SharedState {
    /// Elapsed ticks of the current echo
    pub(crate) ticks: TickAccumulator,
    /// Set by the rising-edge handler of the current cycle
    echo_started: AtomicBool,
    /// Set once per cycle by the falling-edge handler
    echo_done: AtomicBool,
    /// Remaining main-loop iterations with the backlight on
    backlight: Mutex<Cell<u8>>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedState {
    /// Create the shared state: no ticks, no completed echo, backlight expired
    pub const fn new() -> Self {
        Self {
            ticks: TickAccumulator::new(),
            echo_started: AtomicBool::new(false),
            echo_done: AtomicBool::new(false),
            backlight: Mutex::new(Cell::new(0)),
        }
    }

    /// Tick accumulator of the current measurement
    pub fn ticks(&self) -> &TickAccumulator {
        &self.ticks
    }

    /// Elapsed ticks of the last completed echo
    ///
    /// Only meaningful once [`Self::is_measurement_complete`] returned true.
    pub fn elapsed_ticks(&self) -> u32 {
        self.ticks.ticks()
    }

    /// Check whether the falling edge of the current echo has been seen
    pub fn is_measurement_complete(&self) -> bool {
        self.echo_done.load(Ordering::Acquire)
    }

    /// Forget the previous echo before a new cycle
    ///
    /// Clears both the started and the completion flag, so a falling edge
    /// left over from an abandoned cycle cannot complete the new one.
    pub(crate) fn begin_cycle(&self) {
        self.echo_started.store(false, Ordering::Release);
        self.echo_done.store(false, Ordering::Release);
    }

    /// Flag the rising edge of the current cycle (rising-edge handler only)
    pub(crate) fn mark_started(&self) {
        self.echo_started.store(true, Ordering::Release);
    }

    /// Check whether the current cycle has seen its rising edge
    pub fn is_echo_started(&self) -> bool {
        self.echo_started.load(Ordering::Acquire)
    }

    /// Flag the current cycle complete (falling-edge handler only)
    pub(crate) fn mark_complete(&self) {
        self.echo_done.store(true, Ordering::Release);
    }

    /// Remaining backlight iterations
    pub fn backlight_countdown(&self) -> u8 {
        critical_section::with(|cs| self.backlight.borrow(cs).get())
    }

    /// Restart the backlight countdown at `max`
    pub fn retrigger_backlight(&self, max: u8) {
        critical_section::with(|cs| self.backlight.borrow(cs).set(max));
    }

    /// Decrement the backlight countdown if it is running
    ///
    /// Returns true if the countdown was nonzero before the call, i.e. the
    /// backlight should be on for this iteration.
    pub(crate) fn consume_backlight_iteration(&self) -> bool {
        critical_section::with(|cs| {
            let countdown = self.backlight.borrow(cs);
            match countdown.get() {
                0 => false,
                n => {
                    countdown.set(n - 1);
                    true
                }
            }
        })
    }
}
