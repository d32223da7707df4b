//! Distance measurement engine
//!
//! One call to [`Rangefinder::measure`] runs a full cycle:
//!
//! 1. With interrupts masked: enable the echo interrupt, clear the
//!    started and completion flags and zero the tick accumulator and
//!    counter.
//! 2. Drive the trigger pulse (low, high, low).
//! 3. Poll until the falling-edge handler flags the echo complete.
//! 4. Disable the echo interrupt and convert the accumulated ticks.
//!
//! The edge handlers in [`crate::irq`] do the actual timing.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::config::{EchoWait, SonarConfig, TriggerTiming};
use crate::distance::Distance;
use crate::shared::SharedState;
use crate::traits::{DistanceSensor, EchoInterrupt, HardwareCounter, MeasureError};

/// Delay between polls of the completion flag (µs)
///
/// The timeout budget counts requested delay, not wall time. Real delays
/// round up to the timer resolution and the loop itself costs cycles, so on
/// hardware the budget is a lower bound on the actual wait.
pub const ECHO_POLL_US: u32 = 10;

/// HC-SR04 driver on top of the shared edge-interrupt state
pub struct Rangefinder<'a, T, D, C, E> {
    shared: &'a SharedState,
    trigger: T,
    delay: D,
    counter: C,
    echo: E,
    timing: TriggerTiming,
    wait: EchoWait,
}

impl<'a, T, D, C, E> Rangefinder<'a, T, D, C, E>
where
    T: OutputPin,
    D: DelayNs,
    C: HardwareCounter,
    E: EchoInterrupt,
{
    /// Create a rangefinder
    ///
    /// # Arguments
    /// - `shared`: State the edge handlers write into
    /// - `trigger`: Sensor trigger output, idle low
    /// - `delay`: Blocking delay for the pulse and the poll loop
    /// - `counter`: Handle to the same counter the handlers use
    /// - `echo`: Enable control for the echo edge interrupt
    /// - `config`: Trigger timing and echo wait policy
    pub fn new(
        shared: &'a SharedState,
        trigger: T,
        delay: D,
        counter: C,
        echo: E,
        config: &SonarConfig,
    ) -> Self {
        Self {
            shared,
            trigger,
            delay,
            counter,
            echo,
            timing: config.trigger,
            wait: config.echo_wait,
        }
    }

    /// Run one trigger/echo cycle
    pub fn measure(&mut self) -> Result<Distance, MeasureError> {
        critical_section::with(|_| {
            self.echo.arm();
            self.shared.begin_cycle();
            self.shared.ticks.reset(&self.counter);
        });

        if let Err(e) = self.send_trigger() {
            self.abandon();
            return Err(e);
        }

        if let Err(e) = self.wait_for_echo() {
            warn!("no echo, wait policy {}", self.wait);
            self.abandon();
            return Err(e);
        }

        self.echo.disarm();

        let ticks = self.shared.elapsed_ticks();
        let distance = Distance::from_ticks(ticks);
        trace!("echo: {} ticks = {} mm", ticks, distance.mm());
        Ok(distance)
    }

    fn send_trigger(&mut self) -> Result<(), MeasureError> {
        self.trigger.set_low().map_err(|_| MeasureError::Trigger)?;
        self.delay.delay_us(self.timing.settle_low_us);
        self.trigger.set_high().map_err(|_| MeasureError::Trigger)?;
        self.delay.delay_us(self.timing.pulse_high_us);
        self.trigger.set_low().map_err(|_| MeasureError::Trigger)?;
        self.delay.delay_us(self.timing.trailing_low_us);
        Ok(())
    }

    fn wait_for_echo(&mut self) -> Result<(), MeasureError> {
        let budget = match self.wait {
            EchoWait::Forever => None,
            EchoWait::Timeout { micros } => Some(micros),
        };
        let mut waited: u32 = 0;

        while !self.shared.is_measurement_complete() {
            if budget.is_some_and(|limit| waited >= limit) {
                return Err(MeasureError::NoEcho);
            }
            self.delay.delay_us(ECHO_POLL_US);
            waited = waited.saturating_add(ECHO_POLL_US);
        }

        Ok(())
    }

    /// Put the echo hardware back to idle after a failed cycle
    fn abandon(&mut self) {
        critical_section::with(|_| {
            self.echo.disarm();
            self.counter.stop();
            self.counter.set_overflow_interrupt(false);
            self.shared.begin_cycle();
            self.shared.ticks.reset(&self.counter);
        });
    }
}

impl<T, D, C, E> DistanceSensor for Rangefinder<'_, T, D, C, E>
where
    T: OutputPin,
    D: DelayNs,
    C: HardwareCounter,
    E: EchoInterrupt,
{
    fn measure(&mut self) -> Result<Distance, MeasureError> {
        Rangefinder::measure(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{EchoPlan, SimBench, SimCounter, SimDelay, SimEchoIrq, SimTriggerPin};
    use embedded_hal::digital::PinState;

    type SimRangefinder<'a> =
        Rangefinder<'a, SimTriggerPin<'a>, SimDelay<'a>, SimCounter<'a>, SimEchoIrq<'a>>;

    fn rangefinder<'a>(bench: &'a SimBench, config: &SonarConfig) -> SimRangefinder<'a> {
        Rangefinder::new(
            bench.shared(),
            bench.trigger_pin(),
            bench.delay(),
            bench.counter(),
            bench.echo_irq(),
            config,
        )
    }

    #[test]
    fn test_short_echo() {
        let bench = SimBench::new(100);
        bench.set_echo_plan(EchoPlan::Pulse {
            delay: 400,
            width: 58,
        });
        let mut sonar = rangefinder(&bench, &SonarConfig::default());

        assert_eq!(sonar.measure(), Ok(Distance::from_mm(1)));
        assert_eq!(bench.shared().elapsed_ticks(), 58);
    }

    #[test]
    fn test_echo_across_overflows() {
        let bench = SimBench::new(100);
        let width = 3 * 256 + 100;
        bench.set_echo_plan(EchoPlan::Pulse { delay: 0, width });
        let mut sonar = rangefinder(&bench, &SonarConfig::default());

        let distance = sonar.measure().unwrap();

        assert_eq!(bench.overflows(), 3);
        assert_eq!(bench.shared().elapsed_ticks(), width as u32);
        assert_eq!(distance.mm(), 18);
    }

    #[test]
    fn test_trigger_pulse_shape() {
        let bench = SimBench::new(100);
        bench.set_echo_plan(EchoPlan::Pulse { delay: 0, width: 8 });
        let mut sonar = rangefinder(&bench, &SonarConfig::default());

        sonar.measure().unwrap();

        // 20 µs settle, then 12 µs high
        assert_eq!(bench.trigger_count(), 1);
        assert_eq!(bench.last_trigger_pulse(), Some(12 * 8));
        assert_eq!(bench.last_trigger_fall(), Some(32 * 8));
    }

    #[test]
    fn test_echo_disarmed_after_measurement() {
        let bench = SimBench::new(100);
        bench.set_echo_plan(EchoPlan::Pulse {
            delay: 10,
            width: 100,
        });
        let mut sonar = rangefinder(&bench, &SonarConfig::default());

        sonar.measure().unwrap();

        assert!(!bench.is_echo_armed());
        assert!(!bench.is_counter_running());
    }

    #[test]
    fn test_consecutive_measurements_are_independent() {
        let bench = SimBench::new(100);
        let mut sonar = rangefinder(&bench, &SonarConfig::default());

        bench.set_echo_plan(EchoPlan::Pulse {
            delay: 0,
            width: 10_000,
        });
        let far = sonar.measure().unwrap();

        bench.set_echo_plan(EchoPlan::Pulse {
            delay: 0,
            width: 100,
        });
        let near = sonar.measure().unwrap();

        assert_eq!(far.mm(), 212);
        assert_eq!(near.mm(), 2);
        assert_eq!(bench.shared().elapsed_ticks(), 100);
    }

    #[test]
    fn test_silent_sensor_times_out() {
        let bench = SimBench::new(100);
        let mut sonar = rangefinder(&bench, &SonarConfig::default());

        assert_eq!(sonar.measure(), Err(MeasureError::NoEcho));

        let fall = bench.last_trigger_fall().unwrap();
        let waited_us = (bench.now() - fall) / 8;
        assert_eq!(waited_us, 20 + 60_000);
        assert!(!bench.is_echo_armed());
    }

    #[test]
    fn test_stuck_echo_times_out_and_resets() {
        let bench = SimBench::new(100);
        bench.set_echo_plan(EchoPlan::StuckHigh { delay: 100 });
        let mut sonar = rangefinder(&bench, &SonarConfig::default());

        assert_eq!(sonar.measure(), Err(MeasureError::NoEcho));

        assert_eq!(bench.echo_level(), PinState::High);
        assert!(!bench.is_echo_armed());
        assert!(!bench.is_counter_running());
        assert!(!bench.is_overflow_enabled());
        assert_eq!(bench.shared().elapsed_ticks(), 0);
        assert_eq!(bench.counter().value(), 0);
    }

    #[test]
    fn test_wait_forever_outlasts_timeout() {
        let bench = SimBench::new(100);
        // 100 ms echo
        bench.set_echo_plan(EchoPlan::Pulse {
            delay: 0,
            width: 800_000,
        });
        let config = SonarConfig {
            echo_wait: EchoWait::Forever,
            ..Default::default()
        };
        let mut sonar = rangefinder(&bench, &config);

        let distance = sonar.measure().unwrap();
        assert_eq!(distance.mm(), 17_013);
        assert!(distance.exceeds(config.max_range_mm));
    }

    #[test]
    fn test_trigger_failure() {
        let bench = SimBench::new(100);
        bench.set_trigger_failure(true);
        let mut sonar = rangefinder(&bench, &SonarConfig::default());

        assert_eq!(sonar.measure(), Err(MeasureError::Trigger));
        assert!(!bench.is_echo_armed());
        assert_eq!(bench.trigger_count(), 0);
    }

    #[test]
    fn test_recovers_after_timeout() {
        let bench = SimBench::new(100);
        let mut sonar = rangefinder(&bench, &SonarConfig::default());

        assert_eq!(sonar.measure(), Err(MeasureError::NoEcho));

        bench.set_echo_plan(EchoPlan::Pulse {
            delay: 0,
            width: 58,
        });
        assert_eq!(sonar.measure(), Ok(Distance::from_mm(1)));
    }

    #[test]
    fn test_echo_ending_on_wrap() {
        let bench = SimBench::new(100);
        bench.set_echo_plan(EchoPlan::Pulse {
            delay: 40,
            width: 256,
        });
        let mut sonar = rangefinder(&bench, &SonarConfig::default());

        let distance = sonar.measure().unwrap();

        assert_eq!(bench.overflows(), 1);
        assert_eq!(bench.shared().elapsed_ticks(), 256);
        assert_eq!(distance.mm(), 5);

        bench.set_echo_plan(EchoPlan::Pulse {
            delay: 0,
            width: 512,
        });
        sonar.measure().unwrap();
        assert_eq!(bench.shared().elapsed_ticks(), 512);
    }

    #[test]
    fn test_leftover_echo_is_not_a_reading() {
        let bench = SimBench::new(100);
        bench.set_echo_plan(EchoPlan::StuckHigh { delay: 100 });
        let mut sonar = rangefinder(&bench, &SonarConfig::default());
        assert_eq!(sonar.measure(), Err(MeasureError::NoEcho));

        // The line is still high: only the falling edge of this pulse is seen
        bench.set_echo_plan(EchoPlan::Pulse {
            delay: 0,
            width: 16_000,
        });
        assert_eq!(sonar.measure(), Err(MeasureError::NoEcho));
        assert_eq!(bench.shared().elapsed_ticks(), 0);
        assert_eq!(bench.echo_level(), PinState::Low);

        assert_eq!(sonar.measure(), Ok(Distance::from_ticks(16_000)));
    }

    #[test]
    fn test_edge_while_arming_is_not_counted() {
        let bench = SimBench::new(100);
        bench.set_echo_plan(EchoPlan::StuckHigh { delay: 0 });
        let mut sonar = rangefinder(&bench, &SonarConfig::default());
        assert_eq!(sonar.measure(), Err(MeasureError::NoEcho));

        // Stale echo ends while the new cycle is being set up
        bench.set_edge_on_arm(PinState::Low);
        bench.set_echo_plan(EchoPlan::Pulse {
            delay: 0,
            width: 58,
        });

        assert_eq!(sonar.measure(), Ok(Distance::from_mm(1)));
        assert_eq!(bench.shared().elapsed_ticks(), 58);
    }

    #[test]
    fn test_timeout_rounds_up_to_poll_step() {
        let bench = SimBench::new(100);
        let config = SonarConfig {
            echo_wait: EchoWait::Timeout { micros: 60_005 },
            ..Default::default()
        };
        let mut sonar = rangefinder(&bench, &config);

        assert_eq!(sonar.measure(), Err(MeasureError::NoEcho));

        let fall = bench.last_trigger_fall().unwrap();
        let waited_us = (bench.now() - fall) / 8;
        assert_eq!(waited_us, 20 + 60_010);
    }
}
