//! Periodic routines module
//!
//! This module contains the restartable periodic-callback contract, its
//! foreground (tokio timer) and background (wake-driven) variants, and the
//! switch that keeps exactly one of them current.

pub mod background;
pub mod drift;
pub mod foreground;
pub mod switch;

use std::sync::Arc;

use crate::error::Result;

// Re-export main types
pub use background::BackgroundRoutine;
pub use foreground::ForegroundRoutine;
pub use switch::{DisplayMode, Lifecycle, RoutineSwitch};

/// Callback fired by a routine on every tick.
///
/// It runs while the routine holds its internal lock, so it must not start or
/// stop the routine that calls it.
pub type TriggerCallback = Arc<dyn Fn() + Send + Sync>;

/// A periodic callback that can be started and stopped any number of times.
///
/// `start` fires the callback once right away and then on every interval
/// boundary measured from that start. Both calls are idempotent.
pub trait PeriodicRoutine: Send + Sync {
    fn start(&self) -> Result<()>;
    fn stop(&self) -> Result<()>;
    fn is_started(&self) -> bool;
}
