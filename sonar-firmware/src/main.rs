//! Sonar - Ultrasonic Distance Meter Firmware
//!
//! Main firmware binary for RP2040 boards with an HC-SR04 sensor and an
//! HD44780 character LCD. Pins and timing come from `sonar.toml`, validated
//! and compiled in by the build script.
//!
//! Execution contexts:
//! - Thread mode: the measurement loop, which never yields
//! - `SWI_IRQ_1`: interrupt executor running the echo and sense edge tasks
//! - `PWM_IRQ_WRAP`: counter overflow, above everything else

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use embassy_time::Delay;
use {defmt_rtt as _, panic_probe as _};

use sonar_core::backlight::BacklightTimer;
use sonar_core::config::PinConfig;
use sonar_core::controller::Controller;
use sonar_core::irq::EdgeCoordinator;
use sonar_core::rangefinder::Rangefinder;
use sonar_core::SharedState;
use sonar_drivers::backlight::GpioBacklight;
use sonar_drivers::lcd::{Hd44780, LcdBus};
use sonar_hal_rp2040::counter::PwmCounter;
use sonar_hal_rp2040::gpio;
use sonar_hal_rp2040::pins::{PinBank, ECHO_COUNTER_SLICE};

mod tasks;

/// Validated configuration from sonar.toml
mod board_config {
    include!(concat!(env!("OUT_DIR"), "/board_config.rs"));
}

use board_config::{LCD_COLS, LCD_ROWS, PINS, SONAR};

/// Tick counter timing the echo pulse
const COUNTER: PwmCounter = PwmCounter::new(ECHO_COUNTER_SLICE);

/// State shared between the measurement loop and the edge handlers
static SHARED: SharedState = SharedState::new();

/// Edge handlers, called from the edge tasks and the overflow interrupt
static COORDINATOR: EdgeCoordinator<'static, PwmCounter> =
    EdgeCoordinator::new(&SHARED, COUNTER, SONAR.backlight_iterations);

/// Executor for the edge tasks
static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn SWI_IRQ_1() {
    EXECUTOR_HIGH.on_interrupt()
}

#[interrupt]
fn PWM_IRQ_WRAP() {
    if COUNTER.take_overflow() {
        COORDINATOR.on_overflow();
    }
}

/// Main entry point
#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("Sonar firmware starting...");

    // Initialize RP2040 peripherals
    let p = embassy_rp::init(Default::default());
    let (mut bank, remaining) = PinBank::from_peripherals(p);
    // Claimed so nothing else drives the counter slice
    let _echo_counter = remaining.echo_counter;
    info!("Peripherals initialized");

    info!(
        "Config: range {} mm, trigger {}/{}/{} us, echo wait {}, backlight {} iterations",
        SONAR.max_range_mm,
        SONAR.trigger.settle_low_us,
        SONAR.trigger.pulse_high_us,
        SONAR.trigger.trailing_low_us,
        SONAR.echo_wait,
        SONAR.backlight_iterations
    );

    // Backlight first, so the panel is lit while the LCD powers up
    let backlight_pin = gpio::output(unwrap!(bank.take(PINS.backlight.pin)), &PINS.backlight, false);
    let backlight = BacklightTimer::new(
        &SHARED,
        GpioBacklight::new(backlight_pin, SONAR.backlight_polarity),
        SONAR.backlight_iterations,
    );

    // Character LCD on a 4-bit bus
    let lcd_pins = PINS.lcd;
    let mut out = |config: &PinConfig| gpio::output(unwrap!(bank.take(config.pin)), config, false);
    let bus = LcdBus {
        rs: out(&lcd_pins.rs),
        en: out(&lcd_pins.en),
        d4: out(&lcd_pins.data[0]),
        d5: out(&lcd_pins.data[1]),
        d6: out(&lcd_pins.data[2]),
        d7: out(&lcd_pins.data[3]),
    };
    let mut lcd = Hd44780::new(bus, Delay, LCD_ROWS, LCD_COLS);
    match lcd.init() {
        Ok(()) => info!("LCD initialized ({}x{})", LCD_COLS, LCD_ROWS),
        Err(e) => error!("LCD init failed: {}", e),
    }

    // Sensor pins
    let trigger = gpio::output(unwrap!(bank.take(PINS.trigger.pin)), &PINS.trigger, false);
    let echo = gpio::input(unwrap!(bank.take(PINS.echo.pin)), &PINS.echo);
    let sense = gpio::input(unwrap!(bank.take(PINS.sense.pin)), &PINS.sense);

    // Tick counter and its overflow interrupt
    unwrap!(COUNTER.configure());
    interrupt::PWM_IRQ_WRAP.set_priority(Priority::P1);
    // SAFETY: the handler only touches SHARED through critical sections
    unsafe { interrupt::PWM_IRQ_WRAP.enable() };
    info!("Echo counter on PWM slice {}", ECHO_COUNTER_SLICE);

    // Edge tasks preempt the measurement loop
    interrupt::SWI_IRQ_1.set_priority(Priority::P2);
    let spawner = EXECUTOR_HIGH.start(interrupt::SWI_IRQ_1);
    spawner
        .spawn(tasks::echo_edge_task(echo, &COORDINATOR))
        .unwrap();
    spawner
        .spawn(tasks::sense_edge_task(sense, PINS.sense.inverted, &COORDINATOR))
        .unwrap();

    let sensor = Rangefinder::new(&SHARED, trigger, Delay, COUNTER, tasks::EchoGate, &SONAR);
    let mut controller = Controller::new(sensor, lcd, backlight, Delay, SONAR);

    info!("All tasks spawned, entering measurement loop");
    controller.run()
}
