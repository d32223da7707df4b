//! Events that drive the main loop state machine

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Pins configured, banner shown and cleared
    InitComplete,

    // Measurement outcomes
    /// Echo received within the rated range
    Echo,
    /// Echo received beyond the rated range
    EchoOutOfRange,
    /// No echo within the wait budget
    EchoLost,
}
