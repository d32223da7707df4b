//! Backlight output trait

/// Trait for the display backlight output
///
/// Implementations hide the wiring polarity: `set_on(true)` always means
/// "light visible", whichever level the pin has to be driven to.
pub trait BacklightOutput {
    /// Turn the backlight on or off
    fn set_on(&mut self, on: bool);

    /// Check if the backlight is currently on
    fn is_on(&self) -> bool;
}
