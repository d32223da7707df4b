//! Configuration types
//!
//! Board-agnostic configuration structures, validated before use.

pub mod hardware;
pub mod types;

pub use hardware::*;
pub use types::*;
