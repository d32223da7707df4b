//! Configuration types
//!
//! Every tunable of the measurement loop, with defaults matching the
//! reference HC-SR04 build.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::distance::{mm_to_ticks, ticks_to_us, HCSR04_MAX_RANGE_MM};

/// Minimum trigger pulse the HC-SR04 responds to (µs)
pub const MIN_TRIGGER_PULSE_US: u32 = 10;

/// Default echo wait before giving up (µs)
///
/// The HC-SR04 drops its echo line after ~38 ms when nothing reflects.
pub const DEFAULT_ECHO_TIMEOUT_US: u32 = 60_000;

/// Default number of main-loop iterations the backlight stays on
pub const DEFAULT_BACKLIGHT_ITERATIONS: u8 = 100;

/// Trigger pulse shape
///
/// ```text
///         _____
/// ______|     |______
///  settle  high  trailing
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TriggerTiming {
    /// Low time before the pulse (µs)
    pub settle_low_us: u32,
    /// Pulse width (µs)
    pub pulse_high_us: u32,
    /// Low time after the pulse before waiting for the echo (µs)
    pub trailing_low_us: u32,
}

impl Default for TriggerTiming {
    fn default() -> Self {
        Self {
            settle_low_us: 20,
            pulse_high_us: 12,
            trailing_low_us: 20,
        }
    }
}

/// How long `measure()` waits for the falling echo edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EchoWait {
    /// Spin until the echo ends, however long that takes
    ///
    /// A disconnected sensor freezes the device.
    Forever,
    /// Give up after the given number of microseconds
    Timeout {
        /// Wait budget, counted from the end of the trigger pulse
        micros: u32,
    },
}

impl Default for EchoWait {
    fn default() -> Self {
        EchoWait::Timeout {
            micros: DEFAULT_ECHO_TIMEOUT_US,
        }
    }
}

/// Which pin level turns an output on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Polarity {
    /// Pin high = on
    ActiveHigh,
    /// Pin low = on
    #[default]
    ActiveLow,
}

/// Complete measurement loop configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SonarConfig {
    /// Rated maximum range; readings above it are shown as out of range (mm)
    pub max_range_mm: u32,
    /// Trigger pulse shape
    pub trigger: TriggerTiming,
    /// Echo wait policy
    pub echo_wait: EchoWait,
    /// Loop iterations the backlight stays on after the last button press
    pub backlight_iterations: u8,
    /// Backlight pin polarity
    pub backlight_polarity: Polarity,
    /// Pause between measurements (ms)
    pub loop_interval_ms: u32,
    /// How long the startup banner stays up (ms)
    pub banner_ms: u32,
}

impl Default for SonarConfig {
    fn default() -> Self {
        Self {
            max_range_mm: HCSR04_MAX_RANGE_MM,
            trigger: TriggerTiming::default(),
            echo_wait: EchoWait::default(),
            backlight_iterations: DEFAULT_BACKLIGHT_ITERATIONS,
            backlight_polarity: Polarity::ActiveLow,
            loop_interval_ms: 100,
            banner_ms: 1000,
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Maximum range is zero
    ZeroRange,
    /// Trigger pulse shorter than the sensor accepts
    TriggerPulseTooShort,
    /// Echo timeout too short to ever see an echo from the maximum range
    EchoTimeoutTooShort,
    /// Backlight would never turn on
    ZeroBacklightIterations,
    /// Loop interval of zero would starve the sensor's recovery time
    ZeroLoopInterval,
}

impl SonarConfig {
    /// Check the configuration for values the hardware cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_range_mm == 0 {
            return Err(ConfigError::ZeroRange);
        }

        if self.trigger.pulse_high_us < MIN_TRIGGER_PULSE_US {
            return Err(ConfigError::TriggerPulseTooShort);
        }

        if let EchoWait::Timeout { micros } = self.echo_wait {
            if micros < self.max_range_echo_us() {
                return Err(ConfigError::EchoTimeoutTooShort);
            }
        }

        if self.backlight_iterations == 0 {
            return Err(ConfigError::ZeroBacklightIterations);
        }

        if self.loop_interval_ms == 0 {
            return Err(ConfigError::ZeroLoopInterval);
        }

        Ok(())
    }

    /// Echo duration corresponding to the maximum range (µs)
    pub fn max_range_echo_us(&self) -> u32 {
        ticks_to_us(mm_to_ticks(self.max_range_mm))
    }
}
