//! Selection of the current routine across display transitions

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::PeriodicRoutine;
use crate::error::Result;

/// Which tick source drives the display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    Foreground,
    Background,
}

/// Whether the surrounding display is resumed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Resumed,
    Paused,
}

/// Holds both routines and keeps at most one of them running.
///
/// Mode switches may arrive while paused; the new routine is then only
/// selected, and starts on the next `resume`.
pub struct RoutineSwitch {
    foreground: Arc<dyn PeriodicRoutine>,
    background: Arc<dyn PeriodicRoutine>,
    mode: DisplayMode,
    lifecycle: Lifecycle,
}

impl RoutineSwitch {
    /// Start out paused in foreground mode
    pub fn new(foreground: Arc<dyn PeriodicRoutine>, background: Arc<dyn PeriodicRoutine>) -> Self {
        Self {
            foreground,
            background,
            mode: DisplayMode::Foreground,
            lifecycle: Lifecycle::Paused,
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// The routine selected by the current mode
    pub fn current(&self) -> &Arc<dyn PeriodicRoutine> {
        match self.mode {
            DisplayMode::Foreground => &self.foreground,
            DisplayMode::Background => &self.background,
        }
    }

    pub fn resume(&mut self) -> Result<()> {
        self.lifecycle = Lifecycle::Resumed;
        self.current().start()
    }

    pub fn pause(&mut self) -> Result<()> {
        self.lifecycle = Lifecycle::Paused;
        self.current().stop()
    }

    pub fn enter_background(&mut self) -> Result<()> {
        self.switch_to(DisplayMode::Background)
    }

    pub fn enter_foreground(&mut self) -> Result<()> {
        self.switch_to(DisplayMode::Foreground)
    }

    fn switch_to(&mut self, mode: DisplayMode) -> Result<()> {
        if self.mode == mode {
            return Ok(());
        }

        self.current().stop()?;
        self.mode = mode;
        info!("Display switched to {:?} mode", mode);

        if self.lifecycle == Lifecycle::Resumed {
            self.current().start()?;
        }
        Ok(())
    }
}
