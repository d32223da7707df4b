//! GPIO setup from config pin descriptions
//!
//! Turns a [`PinConfig`] (number, inversion, pull-up) into configured
//! embassy-rp pins.

use embassy_rp::gpio::{AnyPin, Input, Level, Output, Pull};
use embassy_rp::Peri;

use sonar_core::config::PinConfig;

/// Maximum number of GPIO pins on RP2040
pub const GPIO_COUNT: u8 = 30;

/// Internal pull for an input pin
pub fn pull_for(config: &PinConfig) -> Pull {
    if config.pull_up {
        Pull::Up
    } else {
        Pull::None
    }
}

/// Electrical level for a logical state
///
/// `active = true` means "asserted", which is low on an inverted pin.
pub fn level_for(config: &PinConfig, active: bool) -> Level {
    if active != config.inverted {
        Level::High
    } else {
        Level::Low
    }
}

/// Configure a push-pull output, starting in the given logical state
pub fn output(pin: Peri<'static, AnyPin>, config: &PinConfig, active: bool) -> Output<'static> {
    Output::new(pin, level_for(config, active))
}

/// Configure an input with the configured pull
pub fn input(pin: Peri<'static, AnyPin>, config: &PinConfig) -> Input<'static> {
    Input::new(pin, pull_for(config))
}
