//! Board-agnostic core logic for the Sonar distance meter
//!
//! This crate contains everything that does not depend on a specific
//! microcontroller:
//!
//! - Hardware abstraction traits (tick counter, echo interrupt, display, backlight)
//! - Tick accumulation across counter overflows
//! - Edge interrupt handlers and the state they share with the main loop
//! - The distance measurement engine and tick-to-millimetre conversion
//! - Backlight auto-off countdown
//! - The main control loop and its state machine
//! - Configuration types and validation
//!
//! Interrupt handlers never block. The main loop and the handlers only ever
//! share [`SharedState`], guarded by interrupt masking through
//! `critical-section`.

#![no_std]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod backlight;
pub mod config;
pub mod controller;
pub mod display;
pub mod distance;
pub mod irq;
pub mod rangefinder;
pub mod shared;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod state;
pub mod timer;
pub mod traits;

pub use distance::Distance;
pub use shared::SharedState;
