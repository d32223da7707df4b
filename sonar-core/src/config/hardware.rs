//! Hardware configuration types
//!
//! Pin assignments for the sensor, the sense button, the backlight and the
//! 4-bit LCD bus.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Pin configuration with optional inversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PinConfig {
    /// GPIO pin number
    pub pin: u8,
    /// Pin is active-low (inverted)
    pub inverted: bool,
    /// Enable internal pull-up
    pub pull_up: bool,
}

impl PinConfig {
    /// Create a new pin config
    pub const fn new(pin: u8) -> Self {
        Self {
            pin,
            inverted: false,
            pull_up: false,
        }
    }

    /// Create an inverted (active-low) pin
    pub const fn inverted(pin: u8) -> Self {
        Self {
            pin,
            inverted: true,
            pull_up: false,
        }
    }

    /// Create a pin with pull-up enabled
    pub const fn with_pullup(pin: u8) -> Self {
        Self {
            pin,
            inverted: false,
            pull_up: true,
        }
    }

    /// Parse a pin string from config
    ///
    /// Supports formats:
    /// - "gpio11" -> pin 11
    /// - "!gpio12" -> pin 12, inverted (active-low)
    /// - "^gpio4" -> pin 4, pull-up enabled
    /// - "!^gpio4" / "^!gpio4" -> both
    ///
    /// The pin number is not checked against the chip; see
    /// [`BoardPins::validate`].
    pub fn parse(s: &str) -> Option<Self> {
        let mut s = s.trim();
        let mut config = Self::new(0);

        loop {
            if let Some(rest) = s.strip_prefix('!') {
                if config.inverted {
                    return None;
                }
                config.inverted = true;
                s = rest;
            } else if let Some(rest) = s.strip_prefix('^') {
                if config.pull_up {
                    return None;
                }
                config.pull_up = true;
                s = rest;
            } else {
                break;
            }
        }

        let digits = s.strip_prefix("gpio")?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        config.pin = digits.parse().ok()?;
        Some(config)
    }
}

/// Pins of the 4-bit HD44780 bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LcdPins {
    /// Register select
    pub rs: PinConfig,
    /// Enable strobe
    pub en: PinConfig,
    /// Data lines D4..D7
    pub data: [PinConfig; 4],
}

/// Every pin the firmware claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoardPins {
    /// Sensor trigger output (idle low)
    pub trigger: PinConfig,
    /// Sensor echo input
    pub echo: PinConfig,
    /// Backlight re-trigger button (active low)
    pub sense: PinConfig,
    /// Backlight output
    pub backlight: PinConfig,
    /// Character LCD
    pub lcd: LcdPins,
}

/// Errors in the pin assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinAssignmentError {
    /// The same GPIO is used twice
    Duplicate(u8),
    /// GPIO number beyond what the chip has
    OutOfRange(u8),
}

impl BoardPins {
    /// All pins in a fixed order: sensor, sense, backlight, LCD
    pub fn all(&self) -> [PinConfig; 10] {
        [
            self.trigger,
            self.echo,
            self.sense,
            self.backlight,
            self.lcd.rs,
            self.lcd.en,
            self.lcd.data[0],
            self.lcd.data[1],
            self.lcd.data[2],
            self.lcd.data[3],
        ]
    }

    /// Check that every pin exists and none is used twice
    ///
    /// # Arguments
    /// - `gpio_count`: Number of GPIOs on the target chip
    pub fn validate(&self, gpio_count: u8) -> Result<(), PinAssignmentError> {
        let pins = self.all();
        let mut seen: u64 = 0;

        for pin in pins.iter().map(|p| p.pin) {
            if pin >= gpio_count || pin >= 64 {
                return Err(PinAssignmentError::OutOfRange(pin));
            }
            let mask = 1u64 << pin;
            if seen & mask != 0 {
                return Err(PinAssignmentError::Duplicate(pin));
            }
            seen |= mask;
        }

        Ok(())
    }
}
