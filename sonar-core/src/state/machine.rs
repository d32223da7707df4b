//! State machine definition

use super::events::Event;

/// Main loop states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Power-on: pins, backlight, display, banner
    #[default]
    Initializing,
    /// Measure, render, service the backlight, sleep; forever
    Measuring,
}

impl State {
    /// Check if this state triggers the sensor
    pub fn measurement_allowed(&self) -> bool {
        matches!(self, State::Measuring)
    }

    /// Process an event and return the next state
    ///
    /// There is no way back to [`State::Initializing`]; events that make no
    /// sense in the current state leave it unchanged.
    pub fn transition(self, event: Event) -> Self {
        use Event::*;
        use State::*;

        match (self, event) {
            (Initializing, InitComplete) => Measuring,
            (Measuring, Echo | EchoOutOfRange | EchoLost) => Measuring,
            (state, _) => state,
        }
    }
}
