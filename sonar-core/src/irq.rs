//! Edge interrupt handlers
//!
//! Two independent sources feed the shared state:
//!
//! - The echo pin, interrupting on any change. The handler samples the pin
//!   on entry to tell a rising edge (echo started) from a falling one (echo
//!   received).
//! - The sense input (button), also interrupting on any change. Pulling it
//!   low restarts the backlight countdown.
//!
//! Plus the counter's overflow notification. All handlers run in bounded
//! time and never block.

use embedded_hal::digital::PinState;

use crate::shared::SharedState;
use crate::traits::HardwareCounter;

/// Interrupt-side view of the measurement hardware
///
/// Holds a reference to the shared state and a counter handle, so firmware
/// can build one in a `static` and call it straight from its handlers.
pub struct EdgeCoordinator<'a, C> {
    shared: &'a SharedState,
    counter: C,
    backlight_max: u8,
}

impl<'a, C: HardwareCounter> EdgeCoordinator<'a, C> {
    /// Create the handler set
    ///
    /// # Arguments
    /// - `shared`: State shared with the main loop
    /// - `counter`: Handle to the tick counter timing the echo
    /// - `backlight_max`: Countdown value restored by the sense input
    pub const fn new(shared: &'a SharedState, counter: C, backlight_max: u8) -> Self {
        Self {
            shared,
            counter,
            backlight_max,
        }
    }

    /// Echo pin changed; `level` is the pin state sampled on entry
    ///
    /// A falling edge only completes the cycle when the same cycle's rising
    /// edge was seen.
    pub fn on_echo_edge(&self, level: PinState) {
        match level {
            PinState::High => {
                // Echo started: count from here
                self.shared.mark_started();
                self.counter.start();
                self.counter.set_overflow_interrupt(true);
            }
            PinState::Low => {
                if !self.shared.is_echo_started() {
                    // Tail of an echo from an abandoned cycle
                    trace!("falling echo edge without rising edge ignored");
                    return;
                }
                self.counter.stop();
                self.shared.ticks.finalize(&self.counter);
                self.shared.mark_complete();
            }
        }
    }

    /// Counter wrapped around
    pub fn on_overflow(&self) {
        self.shared.ticks.on_overflow::<C>();
    }

    /// Sense input changed; `level` is the pin state sampled on entry
    pub fn on_sense_edge(&self, level: PinState) {
        if level == PinState::Low {
            self.shared.retrigger_backlight(self.backlight_max);
        }
    }
}
