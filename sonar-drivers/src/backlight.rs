//! GPIO backlight output
//!
//! The backlight is usually switched by a transistor on a GPIO pin, so the
//! pin level that lights it depends on the wiring.

use embedded_hal::digital::OutputPin;
use sonar_core::config::Polarity;
use sonar_core::traits::BacklightOutput;

/// Backlight on a GPIO pin
pub struct GpioBacklight<P> {
    pin: P,
    polarity: Polarity,
    /// Current logical state (true = light visible)
    on: bool,
}

impl<P: OutputPin> GpioBacklight<P> {
    /// Create a backlight output, initially off
    ///
    /// # Arguments
    /// - `pin`: The GPIO pin driving the backlight switch
    /// - `polarity`: Pin level that turns the backlight on
    pub fn new(pin: P, polarity: Polarity) -> Self {
        let mut backlight = Self {
            pin,
            polarity,
            on: false,
        };
        backlight.set_on(false);
        backlight
    }

    /// Create a backlight lit by driving the pin low
    pub fn new_active_low(pin: P) -> Self {
        Self::new(pin, Polarity::ActiveLow)
    }

    /// Create a backlight lit by driving the pin high
    pub fn new_active_high(pin: P) -> Self {
        Self::new(pin, Polarity::ActiveHigh)
    }
}

impl<P: OutputPin> BacklightOutput for GpioBacklight<P> {
    fn set_on(&mut self, on: bool) {
        self.on = on;

        let high = match self.polarity {
            Polarity::ActiveHigh => on,
            Polarity::ActiveLow => !on,
        };
        // BacklightOutput has no error path
        let _ = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
    }

    fn is_on(&self) -> bool {
        self.on
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;

    /// Mock GPIO pin for testing
    struct MockPin {
        high: bool,
    }

    impl MockPin {
        fn new() -> Self {
            Self { high: false }
        }
    }

    impl ErrorType for MockPin {
        type Error = Infallible;
    }

    impl OutputPin for MockPin {
        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = true;
            Ok(())
        }

        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            Ok(())
        }
    }

    #[test]
    fn test_active_low_backlight() {
        let mut backlight = GpioBacklight::new_active_low(MockPin::new());

        // Off means pin high
        assert!(!backlight.is_on());
        assert!(backlight.pin.high);

        backlight.set_on(true);
        assert!(backlight.is_on());
        assert!(!backlight.pin.high);

        backlight.set_on(false);
        assert!(!backlight.is_on());
        assert!(backlight.pin.high);
    }

    #[test]
    fn test_active_high_backlight() {
        let mut backlight = GpioBacklight::new_active_high(MockPin::new());
        assert!(!backlight.pin.high);

        backlight.set_on(true);
        assert!(backlight.pin.high);
    }

    #[test]
    fn test_drives_backlight_timer() {
        use sonar_core::backlight::BacklightTimer;
        use sonar_core::SharedState;

        let shared = SharedState::new();
        let mut timer =
            BacklightTimer::new(&shared, GpioBacklight::new_active_low(MockPin::new()), 2);
        assert!(timer.is_on());

        timer.tick();
        timer.tick();
        assert!(!timer.tick());
        assert!(!timer.is_on());
    }
}
