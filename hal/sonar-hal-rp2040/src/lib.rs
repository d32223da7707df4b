//! RP2040-specific HAL for the Sonar distance meter
//!
//! This crate provides RP2040-specific implementations:
//! - PWM slice as the free-running echo tick counter
//! - GPIO setup from config pin descriptions
//! - Pin allocation by number for config-driven setup

#![no_std]

pub mod counter;
pub mod gpio;
pub mod pins;
