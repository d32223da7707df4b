//! Tick-to-distance conversion
//!
//! distance = elapsed time × speed of sound / 2
//!
//! With the speed of sound taken as 340.26 m/s, half of it is
//! 17013 cm/s. Ticks come from an 8 MHz source, so
//!
//! ```text
//! distance_cm = ticks * 17013 / 8_000_000
//! distance_mm = ticks * 17013 /   800_000
//! ```
//!
//! All arithmetic is integer and truncating. Do not round.

/// Half the speed of sound in cm/s (340.26 m/s × 100 / 2)
pub const SPEED_CONSTANT: u64 = 17_013;

/// Tick rate scaled so the quotient comes out in millimetres
pub const TIMER_FREQUENCY_CONSTANT: u64 = 800_000;

/// Tick rate of the echo counter in Hz
pub const TICK_RATE_HZ: u32 = 8_000_000;

/// Rated maximum range of the HC-SR04 in millimetres
pub const HCSR04_MAX_RANGE_MM: u32 = 4_000;

/// A measured distance in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Distance(u32);

impl Distance {
    /// Create a distance from millimetres
    pub const fn from_mm(mm: u32) -> Self {
        Self(mm)
    }

    /// Convert an echo duration in ticks to a distance
    pub const fn from_ticks(ticks: u32) -> Self {
        Self(ticks_to_mm(ticks))
    }

    /// Distance in millimetres
    pub const fn mm(&self) -> u32 {
        self.0
    }

    /// Split into whole centimetres and the tenths digit
    ///
    /// 15 mm → (1, 5)
    pub const fn cm_tenths(&self) -> (u32, u32) {
        (self.0 / 10, self.0 % 10)
    }

    /// Check whether the reading lies beyond a rated range
    ///
    /// The rated maximum itself is still in range.
    pub const fn exceeds(&self, max_mm: u32) -> bool {
        self.0 > max_mm
    }
}

/// Convert ticks of the 8 MHz counter to millimetres, truncating
pub const fn ticks_to_mm(ticks: u32) -> u32 {
    // u32::MAX ticks is ~91 km: the quotient always fits
    ((ticks as u64 * SPEED_CONSTANT) / TIMER_FREQUENCY_CONSTANT) as u32
}

/// Smallest echo duration in ticks that converts to at least `mm`
pub const fn mm_to_ticks(mm: u32) -> u32 {
    let ticks = (mm as u64 * TIMER_FREQUENCY_CONSTANT).div_ceil(SPEED_CONSTANT);
    if ticks > u32::MAX as u64 {
        u32::MAX
    } else {
        ticks as u32
    }
}

/// Convert ticks of the 8 MHz counter to microseconds, truncating
pub const fn ticks_to_us(ticks: u32) -> u32 {
    ticks / (TICK_RATE_HZ / 1_000_000)
}
