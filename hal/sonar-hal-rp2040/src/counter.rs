//! PWM slice as the echo tick counter
//!
//! One PWM slice runs in free-running mode with no output pin, clocked at
//! 8 MHz through its fractional divider and wrapping at 0xFFFF. The wrap
//! raises `PWM_IRQ_WRAP`, which the firmware forwards to the edge
//! coordinator as the overflow notification.
//!
//! Register access goes straight to the PAC so the same handle works from
//! thread mode and from interrupt handlers.

use embassy_rp::clocks::clk_sys_freq;
use embassy_rp::pac;

use sonar_core::distance::TICK_RATE_HZ;
use sonar_core::traits::HardwareCounter;

/// Number of PWM slices on the RP2040
pub const SLICE_COUNT: usize = 8;

/// Errors while setting up the counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CounterError {
    /// Slice number beyond the chip's slices
    InvalidSlice,
    /// System clock cannot be divided down to the tick rate exactly
    ClockMismatch {
        /// Current system clock (Hz)
        clk_sys: u32,
    },
}

/// Fractional divider (8.4 fixed point) for `clk_sys` → tick rate
///
/// Returns `None` unless the division is exact and within the divider's
/// range.
pub fn divider_for(clk_sys: u32) -> Option<(u8, u8)> {
    let div16 = clk_sys as u64 * 16;
    if div16 % TICK_RATE_HZ as u64 != 0 {
        return None;
    }
    let div16 = div16 / TICK_RATE_HZ as u64;
    let int = div16 / 16;
    if int == 0 || int > u8::MAX as u64 {
        return None;
    }
    Some((int as u8, (div16 % 16) as u8))
}

/// Free-running PWM slice counting at the echo tick rate
#[derive(Clone, Copy)]
pub struct PwmCounter {
    slice: usize,
}

impl PwmCounter {
    /// Create a handle for a slice
    ///
    /// Does not touch the hardware; call [`Self::configure`] once at boot.
    pub const fn new(slice: usize) -> Self {
        Self { slice }
    }

    /// Program divider and wrap value, leave the counter stopped at zero
    pub fn configure(&self) -> Result<(), CounterError> {
        if self.slice >= SLICE_COUNT {
            return Err(CounterError::InvalidSlice);
        }
        let clk_sys = clk_sys_freq();
        let (int, frac) = divider_for(clk_sys).ok_or(CounterError::ClockMismatch { clk_sys })?;

        let ch = pac::PWM.ch(self.slice);
        // Free-running, no phase correction, disabled
        ch.csr().write(|w| w.set_en(false));
        ch.div().write(|w| {
            w.set_int(int);
            w.set_frac(frac);
        });
        ch.top().write(|w| w.set_top(u16::MAX));
        ch.ctr().write(|w| w.set_ctr(0));

        self.set_overflow_interrupt(false);
        self.clear_overflow();
        Ok(())
    }

    /// Check for a pending wrap and acknowledge it
    ///
    /// Called from `PWM_IRQ_WRAP`, which all slices share.
    pub fn take_overflow(&self) -> bool {
        let pending = pac::PWM.ints().read().0 & self.mask() != 0;
        if pending {
            self.clear_overflow();
        }
        pending
    }

    fn clear_overflow(&self) {
        pac::PWM.intr().write(|w| w.0 = self.mask());
    }

    fn mask(&self) -> u32 {
        1 << self.slice
    }
}

impl HardwareCounter for PwmCounter {
    const RANGE: u32 = u16::MAX as u32 + 1;

    fn start(&self) {
        pac::PWM.ch(self.slice).csr().modify(|w| w.set_en(true));
    }

    fn stop(&self) {
        pac::PWM.ch(self.slice).csr().modify(|w| w.set_en(false));
    }

    fn value(&self) -> u32 {
        pac::PWM.ch(self.slice).ctr().read().ctr() as u32
    }

    fn clear(&self) {
        pac::PWM.ch(self.slice).ctr().write(|w| w.set_ctr(0));
    }

    fn set_overflow_interrupt(&self, enabled: bool) {
        if enabled {
            // Drop a wrap left over from a previous echo
            self.clear_overflow();
        }
        let mask = self.mask();
        pac::PWM.inte().modify(|w| {
            if enabled {
                w.0 |= mask;
            } else {
                w.0 &= !mask;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divider_for_default_clock() {
        // 125 MHz / 15.625 = 8 MHz
        assert_eq!(divider_for(125_000_000), Some((15, 10)));
    }

    #[test]
    fn test_divider_for_other_clocks() {
        assert_eq!(divider_for(8_000_000), Some((1, 0)));
        assert_eq!(divider_for(133_000_000), Some((16, 10)));
        assert_eq!(divider_for(7_000_000), None);
        assert_eq!(divider_for(123_456_789), None);
    }
}
