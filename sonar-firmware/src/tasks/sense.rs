//! Sense input edge task
//!
//! The sense input is a button (or a PIR output) pulled up and switched to
//! ground. Going low restarts the backlight countdown.

use defmt::*;
use embassy_rp::gpio::Input;
use embedded_hal::digital::PinState;

use sonar_core::irq::EdgeCoordinator;
use sonar_hal_rp2040::counter::PwmCounter;

/// Sense edge task
///
/// # Arguments
/// - `sense`: Sense input, pulled as configured
/// - `inverted`: Whether the pin's electrical level is inverted
/// - `coordinator`: Handler set shared with the echo task
#[embassy_executor::task]
pub async fn sense_edge_task(
    mut sense: Input<'static>,
    inverted: bool,
    coordinator: &'static EdgeCoordinator<'static, PwmCounter>,
) {
    info!("Sense edge task started");

    loop {
        sense.wait_for_any_edge().await;
        let level = PinState::from(sense.is_high() != inverted);
        debug!("sense edge: {}", level == PinState::High);
        coordinator.on_sense_edge(level);
    }
}
