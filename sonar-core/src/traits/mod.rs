//! Hardware abstraction traits
//!
//! These traits define the interface between the measurement logic
//! and hardware-specific implementations.

pub mod backlight;
pub mod counter;
pub mod display;
pub mod echo;

pub use backlight::BacklightOutput;
pub use counter::HardwareCounter;
pub use display::{CharDisplay, CharDisplayExt, DisplayError};
pub use echo::{DistanceSensor, EchoInterrupt, MeasureError};
