//! Echo interrupt and distance sensor traits

use crate::distance::Distance;

/// Errors that can occur during a measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MeasureError {
    /// No falling echo edge within the configured wait
    NoEcho,
    /// Driving the trigger pin failed
    Trigger,
}

/// Control over the echo pin's edge interrupt
///
/// Both methods are called from thread mode. `arm` is always called with
/// interrupts masked.
pub trait EchoInterrupt {
    /// Configure the interrupt to fire on any logical change and enable it
    fn arm(&mut self);

    /// Disable the interrupt so stray edges are ignored between measurements
    fn disarm(&mut self);
}

/// Anything that can produce one distance reading on request
pub trait DistanceSensor {
    /// Take one synchronous measurement
    fn measure(&mut self) -> Result<Distance, MeasureError>;
}
