//! Wake Timer - A persistent countdown timer with wake-driven scheduling
//! 
//! This library tracks a single countdown through running and paused states,
//! persists it durably, keeps a wake alarm armed for its expiry, and drives
//! display ticks from either an in-process or a wake-driven routine.

pub mod config;
pub mod error;
pub mod timer;
pub mod state;
pub mod manager;
pub mod wake;
pub mod routine;
pub mod api;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result, StoreError, WakeError};
pub use timer::{Clock, ManualClock, SystemClock, Timer};
pub use state::{AppState, FileStore, KeyValueStore, MemoryStore, PersistedState, TimerStore};
pub use manager::TimerManager;
pub use wake::{TokioWakeScheduler, WakeScheduler, WakeToken};
pub use routine::{BackgroundRoutine, ForegroundRoutine, PeriodicRoutine, RoutineSwitch};
pub use api::create_router;
pub use utils::signals::shutdown_signal;
