//! Echo pin edge task
//!
//! Waits for any edge on the echo input and forwards the sampled level to
//! the edge coordinator. Edges only count while a measurement has armed
//! the gate; anything else is a stray edge (a late echo, noise) and is
//! dropped.

use core::sync::atomic::{AtomicBool, Ordering};

use defmt::*;
use embassy_rp::gpio::Input;
use embedded_hal::digital::PinState;
use portable_atomic::AtomicU32;

use sonar_core::irq::EdgeCoordinator;
use sonar_core::traits::EchoInterrupt;
use sonar_hal_rp2040::counter::PwmCounter;

/// Set while a measurement is waiting for its echo
static ECHO_ARMED: AtomicBool = AtomicBool::new(false);

/// Edges seen while disarmed
static STRAY_EDGES: AtomicU32 = AtomicU32::new(0);

/// Echo interrupt enable, seen from the main loop
pub struct EchoGate;

impl EchoInterrupt for EchoGate {
    fn arm(&mut self) {
        ECHO_ARMED.store(true, Ordering::Release);
    }

    fn disarm(&mut self) {
        ECHO_ARMED.store(false, Ordering::Release);
    }
}

/// Echo edge task
///
/// # Arguments
/// - `echo`: Echo input, pulled as configured
/// - `coordinator`: Handler set shared with the overflow interrupt
#[embassy_executor::task]
pub async fn echo_edge_task(
    mut echo: Input<'static>,
    coordinator: &'static EdgeCoordinator<'static, PwmCounter>,
) {
    info!("Echo edge task started");

    loop {
        echo.wait_for_any_edge().await;
        let level = PinState::from(echo.is_high());

        if ECHO_ARMED.load(Ordering::Acquire) {
            coordinator.on_echo_edge(level);
        } else {
            let stray = STRAY_EDGES.fetch_add(1, Ordering::Relaxed) + 1;
            trace!("stray echo edge ({} total)", stray);
        }
    }
}
