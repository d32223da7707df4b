//! Hardware driver implementations
//!
//! Concrete implementations of the traits defined in sonar-core:
//!
//! - Backlight output on a GPIO pin, either polarity
//! - HD44780 character LCD on a 4-bit parallel bus

#![no_std]
#![deny(unsafe_code)]

pub mod backlight;
pub mod lcd;
