//! Backlight timeout
//!
//! The backlight stays on for a fixed number of main-loop iterations after
//! the last press of the sense button. The countdown lives in
//! [`SharedState`]: the sense handler restarts it, the main loop consumes
//! one step per iteration through [`BacklightTimer::tick`].

use crate::shared::SharedState;
use crate::traits::BacklightOutput;

/// Drives a backlight output from the shared countdown
pub struct BacklightTimer<'a, B> {
    shared: &'a SharedState,
    output: B,
    max: u8,
}

impl<'a, B: BacklightOutput> BacklightTimer<'a, B> {
    /// Create the timer with the countdown full and the backlight on
    ///
    /// # Arguments
    /// - `shared`: State the sense handler writes into
    /// - `output`: Backlight pin, polarity already handled
    /// - `max`: Iterations the backlight stays on after a retrigger
    pub fn new(shared: &'a SharedState, mut output: B, max: u8) -> Self {
        shared.retrigger_backlight(max);
        output.set_on(true);
        Self {
            shared,
            output,
            max,
        }
    }

    /// Restart the countdown from thread mode
    pub fn retrigger(&self) {
        self.shared.retrigger_backlight(self.max);
    }

    /// Advance one main-loop iteration
    ///
    /// Lights the backlight while the countdown is running and turns it off
    /// once it reaches zero. Returns whether the backlight is on.
    pub fn tick(&mut self) -> bool {
        let on = self.shared.consume_backlight_iteration();
        if on != self.output.is_on() {
            if on {
                debug!("backlight on");
            } else {
                debug!("backlight off");
            }
            self.output.set_on(on);
        }
        on
    }

    /// Remaining iterations before the backlight turns off
    pub fn remaining(&self) -> u8 {
        self.shared.backlight_countdown()
    }

    /// Check if the backlight is on
    pub fn is_on(&self) -> bool {
        self.output.is_on()
    }
}
