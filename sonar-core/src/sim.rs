//! Interrupt simulation bench
//!
//! A single-threaded stand-in for the sensor, the tick counter and the
//! interrupt controller, so the measurement engine and the main loop can run
//! on the host exactly as they would on hardware.
//!
//! Time only moves inside [`SimDelay`]. While it advances, the bench fires
//! the same [`EdgeCoordinator`] handlers the firmware binds to real
//! interrupts, at the tick they would occur:
//!
//! - the counter overflow, whenever a running counter wraps with its
//!   notification enabled
//! - echo edges, scheduled relative to the falling edge of each trigger pulse
//! - sense input edges, scheduled at absolute ticks
//!
//! The counter models an 8-bit timer clocked at 8 MHz.

use core::cell::{Cell, RefCell};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin, PinState};
use heapless::{String, Vec};

use crate::distance::TICK_RATE_HZ;
use crate::irq::EdgeCoordinator;
use crate::shared::SharedState;
use crate::traits::{
    BacklightOutput, CharDisplay, DisplayError, EchoInterrupt, HardwareCounter,
};

/// Ticks per wraparound of the simulated counter
pub const SIM_COUNTER_RANGE: u32 = 256;

/// Nanoseconds per simulated tick
const NS_PER_TICK: u64 = 1_000_000_000 / TICK_RATE_HZ as u64;

/// Columns of the simulated display
pub const SIM_DISPLAY_COLS: usize = 16;

/// Rows of the simulated display
pub const SIM_DISPLAY_ROWS: usize = 2;

/// Maximum pending sense edges
const MAX_SENSE_EVENTS: usize = 16;

/// How the simulated sensor answers a trigger pulse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoPlan {
    /// No echo at all (sensor disconnected)
    Silent,
    /// Echo rises after `delay` ticks and lasts `width` ticks
    Pulse {
        /// Ticks from the trigger's falling edge to the echo's rising edge
        delay: u64,
        /// Echo high time in ticks
        width: u64,
    },
    /// Echo rises after `delay` ticks and never falls
    StuckHigh {
        /// Ticks from the trigger's falling edge to the echo's rising edge
        delay: u64,
    },
}

/// The simulated world: sensor, counter, interrupt lines and time
pub struct SimBench {
    shared: SharedState,
    backlight_max: u8,

    now: Cell<u64>,
    sub_tick_ns: Cell<u64>,

    counter_value: Cell<u32>,
    counter_running: Cell<bool>,
    overflow_irq: Cell<bool>,
    overflows: Cell<u32>,

    echo_plan: Cell<EchoPlan>,
    echo_level: Cell<PinState>,
    echo_armed: Cell<bool>,
    pending_rise: Cell<Option<u64>>,
    pending_fall: Cell<Option<u64>>,
    edge_on_arm: Cell<Option<PinState>>,
    latched_echo: Cell<Option<PinState>>,

    trigger_level: Cell<PinState>,
    trigger_high_since: Cell<Option<u64>>,
    last_pulse: Cell<Option<u64>>,
    last_trigger_fall: Cell<Option<u64>>,
    triggers: Cell<u32>,
    fail_trigger: Cell<bool>,

    sense_events: RefCell<Vec<(u64, PinState), MAX_SENSE_EVENTS>>,

    backlight_on: Cell<bool>,
    backlight_switches: Cell<u32>,

    screen: RefCell<[[u8; SIM_DISPLAY_COLS]; SIM_DISPLAY_ROWS]>,
    cursor: Cell<(u8, u8)>,
    clears: Cell<u32>,
}

impl SimBench {
    /// Create a bench at tick 0 with a silent sensor
    ///
    /// # Arguments
    /// - `backlight_max`: Countdown value restored by a sense edge
    pub fn new(backlight_max: u8) -> Self {
        Self {
            shared: SharedState::new(),
            backlight_max,
            now: Cell::new(0),
            sub_tick_ns: Cell::new(0),
            counter_value: Cell::new(0),
            counter_running: Cell::new(false),
            overflow_irq: Cell::new(false),
            overflows: Cell::new(0),
            echo_plan: Cell::new(EchoPlan::Silent),
            echo_level: Cell::new(PinState::Low),
            echo_armed: Cell::new(false),
            pending_rise: Cell::new(None),
            pending_fall: Cell::new(None),
            edge_on_arm: Cell::new(None),
            latched_echo: Cell::new(None),
            trigger_level: Cell::new(PinState::Low),
            trigger_high_since: Cell::new(None),
            last_pulse: Cell::new(None),
            last_trigger_fall: Cell::new(None),
            triggers: Cell::new(0),
            fail_trigger: Cell::new(false),
            sense_events: RefCell::new(Vec::new()),
            backlight_on: Cell::new(false),
            backlight_switches: Cell::new(0),
            screen: RefCell::new([[b' '; SIM_DISPLAY_COLS]; SIM_DISPLAY_ROWS]),
            cursor: Cell::new((0, 0)),
            clears: Cell::new(0),
        }
    }

    /// State shared between the handlers and the code under test
    pub fn shared(&self) -> &SharedState {
        &self.shared
    }

    /// Handler set wired to this bench's counter
    pub fn coordinator(&self) -> EdgeCoordinator<'_, SimCounter<'_>> {
        EdgeCoordinator::new(&self.shared, self.counter(), self.backlight_max)
    }

    /// Handle to the simulated tick counter
    pub fn counter(&self) -> SimCounter<'_> {
        SimCounter { bench: self }
    }

    /// Blocking delay that advances simulated time
    pub fn delay(&self) -> SimDelay<'_> {
        SimDelay { bench: self }
    }

    /// The sensor's trigger input
    pub fn trigger_pin(&self) -> SimTriggerPin<'_> {
        SimTriggerPin { bench: self }
    }

    /// Enable line of the echo interrupt
    pub fn echo_irq(&self) -> SimEchoIrq<'_> {
        SimEchoIrq { bench: self }
    }

    /// Backlight output
    pub fn backlight(&self) -> SimBacklight<'_> {
        SimBacklight { bench: self }
    }

    /// Character display
    pub fn display(&self) -> SimDisplay<'_> {
        SimDisplay { bench: self }
    }

    /// Current simulated time in ticks
    pub fn now(&self) -> u64 {
        self.now.get()
    }

    /// Set how the sensor answers subsequent trigger pulses
    pub fn set_echo_plan(&self, plan: EchoPlan) {
        self.echo_plan.set(plan);
    }

    /// Drive the echo line to `level` at the instant the next `arm()` runs
    ///
    /// Models an edge arriving while interrupts are masked: the edge is
    /// latched and its handler runs as soon as time moves again.
    pub fn set_edge_on_arm(&self, level: PinState) {
        self.edge_on_arm.set(Some(level));
    }

    /// Make the next trigger pulses fail
    pub fn set_trigger_failure(&self, fail: bool) {
        self.fail_trigger.set(fail);
    }

    /// Schedule a sense input edge `after` ticks from now
    ///
    /// Returns false if the event queue is full.
    pub fn schedule_sense(&self, after: u64, level: PinState) -> bool {
        let at = self.now.get() + after;
        self.sense_events.borrow_mut().push((at, level)).is_ok()
    }

    /// Echo line level
    pub fn echo_level(&self) -> PinState {
        self.echo_level.get()
    }

    /// Check if the echo interrupt is enabled
    pub fn is_echo_armed(&self) -> bool {
        self.echo_armed.get()
    }

    /// Check if the counter is connected to its clock
    pub fn is_counter_running(&self) -> bool {
        self.counter_running.get()
    }

    /// Check if the overflow notification is enabled
    pub fn is_overflow_enabled(&self) -> bool {
        self.overflow_irq.get()
    }

    /// Overflow notifications delivered so far
    pub fn overflows(&self) -> u32 {
        self.overflows.get()
    }

    /// Trigger pulses seen so far
    pub fn trigger_count(&self) -> u32 {
        self.triggers.get()
    }

    /// Width of the last trigger pulse in ticks
    pub fn last_trigger_pulse(&self) -> Option<u64> {
        self.last_pulse.get()
    }

    /// Tick at which the last trigger pulse ended
    pub fn last_trigger_fall(&self) -> Option<u64> {
        self.last_trigger_fall.get()
    }

    /// Check if the backlight is lit
    pub fn is_backlight_on(&self) -> bool {
        self.backlight_on.get()
    }

    /// Number of backlight on/off changes so far
    pub fn backlight_switches(&self) -> u32 {
        self.backlight_switches.get()
    }

    /// Number of display clears so far
    pub fn display_clears(&self) -> u32 {
        self.clears.get()
    }

    /// First `width` columns of a display row
    pub fn display_field(&self, row: usize, width: usize) -> String<SIM_DISPLAY_COLS> {
        let screen = self.screen.borrow();
        let mut out = String::new();
        for &b in screen[row].iter().take(width) {
            let _ = out.push(b as char);
        }
        out
    }

    fn advance(&self, ticks: u64) {
        if let Some(level) = self.latched_echo.take() {
            if self.echo_armed.get() {
                self.coordinator().on_echo_edge(level);
            }
        }

        let target = self.now.get() + ticks;

        loop {
            let now = self.now.get();
            let next = self.next_event_time().filter(|&t| t <= target);

            let Some(at) = next else {
                self.run_counter(target - now);
                self.now.set(target);
                return;
            };

            self.run_counter(at - now);
            self.now.set(at);
            self.fire_edges(at);
        }
    }

    fn next_event_time(&self) -> Option<u64> {
        let now = self.now.get();
        let overflow = self
            .counter_running
            .get()
            .then(|| now + (SIM_COUNTER_RANGE - self.counter_value.get()) as u64);
        let sense = self.sense_events.borrow().iter().map(|&(t, _)| t).min();

        [overflow, self.pending_rise.get(), self.pending_fall.get(), sense]
            .into_iter()
            .flatten()
            .min()
    }

    fn run_counter(&self, ticks: u64) {
        if !self.counter_running.get() || ticks == 0 {
            return;
        }
        // advance() never steps past a wraparound
        let value = self.counter_value.get() + ticks as u32;
        if value >= SIM_COUNTER_RANGE {
            self.counter_value.set(0);
            if self.overflow_irq.get() {
                self.overflows.set(self.overflows.get() + 1);
                self.coordinator().on_overflow();
            }
        } else {
            self.counter_value.set(value);
        }
    }

    fn fire_edges(&self, at: u64) {
        if self.pending_rise.get() == Some(at) {
            self.pending_rise.set(None);
            self.set_echo(PinState::High);
        }
        if self.pending_fall.get() == Some(at) {
            self.pending_fall.set(None);
            self.set_echo(PinState::Low);
        }

        let due = {
            let mut events = self.sense_events.borrow_mut();
            let due = events.iter().position(|&(t, _)| t == at);
            due.map(|i| events.swap_remove(i).1)
        };
        if let Some(level) = due {
            self.coordinator().on_sense_edge(level);
        }
    }

    fn set_echo(&self, level: PinState) {
        if self.echo_level.get() == level {
            return;
        }
        self.echo_level.set(level);
        if self.echo_armed.get() {
            self.coordinator().on_echo_edge(level);
        }
    }

    fn trigger_falling(&self) {
        let now = self.now.get();
        if let Some(since) = self.trigger_high_since.take() {
            self.last_pulse.set(Some(now - since));
        }
        self.last_trigger_fall.set(Some(now));
        self.triggers.set(self.triggers.get() + 1);

        match self.echo_plan.get() {
            EchoPlan::Silent => {}
            EchoPlan::Pulse { delay, width } => {
                self.pending_rise.set(Some(now + delay));
                self.pending_fall.set(Some(now + delay + width));
            }
            EchoPlan::StuckHigh { delay } => {
                self.pending_rise.set(Some(now + delay));
            }
        }
    }
}

/// Simulated 8-bit counter handle
#[derive(Clone, Copy)]
pub struct SimCounter<'b> {
    bench: &'b SimBench,
}

impl HardwareCounter for SimCounter<'_> {
    const RANGE: u32 = SIM_COUNTER_RANGE;

    fn start(&self) {
        self.bench.counter_running.set(true);
    }

    fn stop(&self) {
        self.bench.counter_running.set(false);
    }

    fn value(&self) -> u32 {
        self.bench.counter_value.get()
    }

    fn clear(&self) {
        self.bench.counter_value.set(0);
    }

    fn set_overflow_interrupt(&self, enabled: bool) {
        self.bench.overflow_irq.set(enabled);
    }
}

/// Blocking delay; the only way simulated time moves
#[derive(Clone, Copy)]
pub struct SimDelay<'b> {
    bench: &'b SimBench,
}

impl DelayNs for SimDelay<'_> {
    fn delay_ns(&mut self, ns: u32) {
        let total = self.bench.sub_tick_ns.get() + ns as u64;
        self.bench.sub_tick_ns.set(total % NS_PER_TICK);
        self.bench.advance(total / NS_PER_TICK);
    }
}

/// Trigger pin write failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimPinError;

impl embedded_hal::digital::Error for SimPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// The sensor's trigger input
pub struct SimTriggerPin<'b> {
    bench: &'b SimBench,
}

impl ErrorType for SimTriggerPin<'_> {
    type Error = SimPinError;
}

impl OutputPin for SimTriggerPin<'_> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.bench.fail_trigger.get() {
            return Err(SimPinError);
        }
        if self.bench.trigger_level.replace(PinState::Low) == PinState::High {
            self.bench.trigger_falling();
        }
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if self.bench.fail_trigger.get() {
            return Err(SimPinError);
        }
        if self.bench.trigger_level.replace(PinState::High) == PinState::Low {
            self.bench.trigger_high_since.set(Some(self.bench.now.get()));
        }
        Ok(())
    }
}

/// Enable line of the echo pin interrupt
pub struct SimEchoIrq<'b> {
    bench: &'b SimBench,
}

impl EchoInterrupt for SimEchoIrq<'_> {
    fn arm(&mut self) {
        self.bench.echo_armed.set(true);
        if let Some(level) = self.bench.edge_on_arm.take() {
            if self.bench.echo_level.replace(level) != level {
                self.bench.latched_echo.set(Some(level));
            }
        }
    }

    fn disarm(&mut self) {
        self.bench.echo_armed.set(false);
    }
}

/// Backlight output
pub struct SimBacklight<'b> {
    bench: &'b SimBench,
}

impl BacklightOutput for SimBacklight<'_> {
    fn set_on(&mut self, on: bool) {
        if self.bench.backlight_on.replace(on) != on {
            self.bench
                .backlight_switches
                .set(self.bench.backlight_switches.get() + 1);
        }
    }

    fn is_on(&self) -> bool {
        self.bench.backlight_on.get()
    }
}

/// Character display with a 2x16 character grid
pub struct SimDisplay<'b> {
    bench: &'b SimBench,
}

impl CharDisplay for SimDisplay<'_> {
    fn clear(&mut self) -> Result<(), DisplayError> {
        *self.bench.screen.borrow_mut() = [[b' '; SIM_DISPLAY_COLS]; SIM_DISPLAY_ROWS];
        self.bench.cursor.set((0, 0));
        self.bench.clears.set(self.bench.clears.get() + 1);
        Ok(())
    }

    fn set_cursor(&mut self, row: u8, col: u8) -> Result<(), DisplayError> {
        if row as usize >= SIM_DISPLAY_ROWS || col as usize >= SIM_DISPLAY_COLS {
            return Err(DisplayError::InvalidPosition);
        }
        self.bench.cursor.set((row, col));
        Ok(())
    }

    fn write_text(&mut self, text: &str) -> Result<(), DisplayError> {
        let (row, mut col) = self.bench.cursor.get();
        let mut screen = self.bench.screen.borrow_mut();
        for b in text.bytes() {
            if col as usize >= SIM_DISPLAY_COLS {
                return Err(DisplayError::InvalidPosition);
            }
            screen[row as usize][col as usize] = b;
            col += 1;
        }
        self.bench.cursor.set((row, col));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_advances_ticks() {
        let bench = SimBench::new(100);
        bench.delay().delay_us(20);
        assert_eq!(bench.now(), 160);
        bench.delay().delay_ns(100);
        bench.delay().delay_ns(25);
        assert_eq!(bench.now(), 161);
    }

    #[test]
    fn test_counter_overflow_fires_handler() {
        let bench = SimBench::new(100);
        let counter = bench.counter();
        counter.start();
        counter.set_overflow_interrupt(true);

        bench.delay().delay_ns((3 * 256 + 10) * 125);

        assert_eq!(bench.overflows(), 3);
        assert_eq!(counter.value(), 10);
        assert_eq!(bench.shared().elapsed_ticks(), 3 * 256);
    }

    #[test]
    fn test_stopped_counter_holds_value() {
        let bench = SimBench::new(100);
        let counter = bench.counter();
        counter.start();
        bench.delay().delay_us(5);
        counter.stop();
        bench.delay().delay_us(100);
        assert_eq!(counter.value(), 40);
    }

    #[test]
    fn test_echo_follows_trigger() {
        let bench = SimBench::new(100);
        bench.set_echo_plan(EchoPlan::Pulse {
            delay: 8,
            width: 16,
        });
        let mut pin = bench.trigger_pin();

        pin.set_high().unwrap();
        bench.delay().delay_us(10);
        pin.set_low().unwrap();
        assert_eq!(bench.last_trigger_pulse(), Some(80));

        bench.delay().delay_us(1);
        assert_eq!(bench.echo_level(), PinState::High);
        bench.delay().delay_us(2);
        assert_eq!(bench.echo_level(), PinState::Low);
    }

    #[test]
    fn test_unarmed_echo_is_ignored() {
        let bench = SimBench::new(100);
        bench.set_echo_plan(EchoPlan::Pulse { delay: 0, width: 8 });
        let mut pin = bench.trigger_pin();
        pin.set_high().unwrap();
        pin.set_low().unwrap();

        bench.delay().delay_us(5);
        assert!(!bench.shared().is_measurement_complete());
    }

    #[test]
    fn test_edge_on_arm_is_delivered_when_time_moves() {
        let bench = SimBench::new(100);
        bench.set_edge_on_arm(PinState::High);
        let mut irq = bench.echo_irq();

        irq.arm();
        assert_eq!(bench.echo_level(), PinState::High);
        assert!(!bench.is_counter_running());

        bench.delay().delay_ns(125);
        assert!(bench.is_counter_running());
    }

    #[test]
    fn test_sense_edge_reaches_handler() {
        let bench = SimBench::new(42);
        assert!(bench.schedule_sense(80, PinState::Low));
        bench.delay().delay_us(10);
        assert_eq!(bench.shared().backlight_countdown(), 42);
    }

    #[test]
    fn test_display_grid() {
        let bench = SimBench::new(100);
        let mut display = bench.display();
        display.set_cursor(1, 2).unwrap();
        display.write_text("ab").unwrap();
        assert_eq!(bench.display_field(1, 4).as_str(), "  ab");
        assert_eq!(
            display.set_cursor(2, 0),
            Err(DisplayError::InvalidPosition)
        );
    }
}
