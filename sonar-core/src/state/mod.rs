//! State machine for the main control loop
//!
//! Two states: a one-shot initialisation, then measuring forever.

pub mod events;
pub mod machine;

pub use events::Event;
pub use machine::State;
