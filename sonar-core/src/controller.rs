//! Main control loop
//!
//! Initialises once, then measures forever:
//!
//! ```text
//! Initializing ── banner, clear ──▶ Measuring ─┐
//!                                      ▲       │ measure, render,
//!                                      └───────┘ backlight tick, sleep
//! ```

use embedded_hal::delay::DelayNs;

use crate::backlight::BacklightTimer;
use crate::config::SonarConfig;
use crate::display::Screen;
use crate::distance::Distance;
use crate::state::{Event, State};
use crate::traits::{BacklightOutput, CharDisplay, DisplayError, DistanceSensor, MeasureError};

/// Outcome of one loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reading {
    /// Distance within the rated range
    InRange(Distance),
    /// Distance beyond the rated range
    OutOfRange(Distance),
    /// The measurement failed
    Failed(MeasureError),
}

impl Reading {
    fn event(&self) -> Event {
        match self {
            Reading::InRange(_) => Event::Echo,
            Reading::OutOfRange(_) => Event::EchoOutOfRange,
            Reading::Failed(_) => Event::EchoLost,
        }
    }

    fn screen(&self) -> Screen {
        match self {
            Reading::InRange(distance) => Screen::Reading(*distance),
            Reading::OutOfRange(_) => Screen::OutOfRange,
            Reading::Failed(_) => Screen::NoEcho,
        }
    }
}

/// The distance meter application
pub struct Controller<'a, S, D, B, T> {
    sensor: S,
    display: D,
    backlight: BacklightTimer<'a, B>,
    delay: T,
    config: SonarConfig,
    state: State,
}

impl<'a, S, D, B, T> Controller<'a, S, D, B, T>
where
    S: DistanceSensor,
    D: CharDisplay,
    B: BacklightOutput,
    T: DelayNs,
{
    /// Assemble the application
    ///
    /// The backlight timer should be created before the display is
    /// initialised so the panel is lit while it powers up.
    pub fn new(
        sensor: S,
        display: D,
        backlight: BacklightTimer<'a, B>,
        delay: T,
        config: SonarConfig,
    ) -> Self {
        Self {
            sensor,
            display,
            backlight,
            delay,
            config,
            state: State::Initializing,
        }
    }

    /// Current state
    pub fn state(&self) -> State {
        self.state
    }

    /// Backlight timer
    pub fn backlight(&self) -> &BacklightTimer<'a, B> {
        &self.backlight
    }

    /// Show the startup banner, then clear the screen
    pub fn init(&mut self) -> Result<(), DisplayError> {
        self.display.clear()?;
        Screen::Banner.render(&mut self.display)?;
        self.delay.delay_ms(self.config.banner_ms);
        self.display.clear()?;
        self.handle(Event::InitComplete);
        Ok(())
    }

    /// Run one measuring iteration
    ///
    /// Initialises first if that has not happened yet. The backlight tick and
    /// the loop sleep happen even when initialisation or the display write
    /// fails.
    pub fn step(&mut self) -> Result<Reading, DisplayError> {
        if !self.state.measurement_allowed() {
            if let Err(e) = self.init() {
                // Keep the backlight timeout and loop pace while the panel is unusable
                self.backlight.tick();
                self.delay.delay_ms(self.config.loop_interval_ms);
                return Err(e);
            }
        }

        let reading = match self.sensor.measure() {
            Ok(distance) if distance.exceeds(self.config.max_range_mm) => {
                debug!("out of range: {} mm", distance.mm());
                Reading::OutOfRange(distance)
            }
            Ok(distance) => Reading::InRange(distance),
            Err(e) => {
                warn!("measurement failed: {}", e);
                Reading::Failed(e)
            }
        };
        self.handle(reading.event());

        let rendered = reading.screen().render(&mut self.display);
        self.backlight.tick();
        self.delay.delay_ms(self.config.loop_interval_ms);

        rendered.map(|()| reading)
    }

    /// Run forever
    pub fn run(&mut self) -> ! {
        loop {
            if let Err(e) = self.step() {
                warn!("display error: {}", e);
            }
        }
    }

    fn handle(&mut self, event: Event) {
        let next = self.state.transition(event);
        if next != self.state {
            info!("state: {} -> {}", self.state, next);
        }
        self.state = next;
    }
}
