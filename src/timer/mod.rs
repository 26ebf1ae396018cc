//! Timer value type and time sources
//! 
//! This module contains the immutable countdown snapshot and the clock
//! abstraction every component reads "now" from.

pub mod clock;
pub mod timer;

// Re-export main types
pub use clock::{Clock, ManualClock, SystemClock};
pub use timer::{Timer, TimerView};
