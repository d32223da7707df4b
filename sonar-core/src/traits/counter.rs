//! Free-running hardware tick counter

/// A fixed-width hardware counter with an overflow notification
///
/// Implementations are thin register handles: every method takes `&self`
/// so the same handle can be used from thread mode and from interrupt
/// handlers. Callers are responsible for masking interrupts where a
/// sequence of calls must be atomic.
pub trait HardwareCounter {
    /// Ticks counted between two consecutive overflow notifications
    ///
    /// For an 8-bit counter wrapping from 255 to 0 this is 256.
    const RANGE: u32;

    /// Connect the counter to its clock source
    fn start(&self);

    /// Disconnect the counter from its clock source
    ///
    /// The current count is retained.
    fn stop(&self);

    /// Current (non-wrapped) count, always below [`Self::RANGE`]
    fn value(&self) -> u32;

    /// Reset the count to zero
    fn clear(&self);

    /// Enable or disable the overflow notification
    fn set_overflow_interrupt(&self, enabled: bool);
}
