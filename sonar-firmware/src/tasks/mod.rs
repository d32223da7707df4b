//! Embassy async tasks
//!
//! Both tasks run on the high-priority interrupt executor: the main loop
//! busy-waits on the echo, so nothing on the thread executor would ever
//! get polled.

pub mod echo;
pub mod sense;

pub use echo::{echo_edge_task, EchoGate};
pub use sense::sense_edge_task;
