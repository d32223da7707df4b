//! Pin allocation by number
//!
//! Pin numbers come from `sonar.toml`, so the firmware cannot name
//! `p.PIN_n` fields directly. [`PinBank`] holds every GPIO and hands them
//! out by number, once each.

use embassy_rp::gpio::AnyPin;
use embassy_rp::peripherals::PWM_SLICE7;
use embassy_rp::{Peri, Peripherals};

use crate::gpio::GPIO_COUNT;

/// Error when requesting a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinError {
    /// Pin number out of range (0-29 valid)
    InvalidPin(u8),
    /// Pin already taken
    AlreadyTaken(u8),
}

/// Pin bank that holds all GPIO pins and allows taking them by number
pub struct PinBank {
    pins: [Option<Peri<'static, AnyPin>>; GPIO_COUNT as usize],
}

impl PinBank {
    /// Split the peripherals into the pin bank and everything else
    pub fn from_peripherals(p: Peripherals) -> (Self, RemainingPeripherals) {
        let bank = Self {
            pins: [
                Some(p.PIN_0.into()),
                Some(p.PIN_1.into()),
                Some(p.PIN_2.into()),
                Some(p.PIN_3.into()),
                Some(p.PIN_4.into()),
                Some(p.PIN_5.into()),
                Some(p.PIN_6.into()),
                Some(p.PIN_7.into()),
                Some(p.PIN_8.into()),
                Some(p.PIN_9.into()),
                Some(p.PIN_10.into()),
                Some(p.PIN_11.into()),
                Some(p.PIN_12.into()),
                Some(p.PIN_13.into()),
                Some(p.PIN_14.into()),
                Some(p.PIN_15.into()),
                Some(p.PIN_16.into()),
                Some(p.PIN_17.into()),
                Some(p.PIN_18.into()),
                Some(p.PIN_19.into()),
                Some(p.PIN_20.into()),
                Some(p.PIN_21.into()),
                Some(p.PIN_22.into()),
                Some(p.PIN_23.into()),
                Some(p.PIN_24.into()),
                Some(p.PIN_25.into()),
                Some(p.PIN_26.into()),
                Some(p.PIN_27.into()),
                Some(p.PIN_28.into()),
                Some(p.PIN_29.into()),
            ],
        };
        let remaining = RemainingPeripherals {
            echo_counter: p.PWM_SLICE7,
        };
        (bank, remaining)
    }

    /// Take a pin by number
    pub fn take(&mut self, pin_num: u8) -> Result<Peri<'static, AnyPin>, PinError> {
        if pin_num >= GPIO_COUNT {
            return Err(PinError::InvalidPin(pin_num));
        }
        self.pins[pin_num as usize]
            .take()
            .ok_or(PinError::AlreadyTaken(pin_num))
    }
}

/// Non-GPIO peripherals that remain after creating the pin bank
pub struct RemainingPeripherals {
    /// PWM slice reserved for the echo tick counter (see [`ECHO_COUNTER_SLICE`])
    pub echo_counter: Peri<'static, PWM_SLICE7>,
}

/// PWM slice number behind [`RemainingPeripherals::echo_counter`]
pub const ECHO_COUNTER_SLICE: usize = 7;
