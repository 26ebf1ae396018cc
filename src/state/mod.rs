//! State management module
//! 
//! This module contains the persisted timer state, its codec and stores, and
//! the in-memory state of the daemon host.

pub mod alarm_state;
pub mod app_state;
pub mod codec;
pub mod countdown_state;
pub mod persisted_state;
pub mod store;
pub mod timer_store;

// Re-export main types
pub use alarm_state::AlarmState;
pub use app_state::AppState;
pub use countdown_state::{CountdownPhase, CountdownState};
pub use persisted_state::PersistedState;
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use timer_store::{TimerStore, KEY_TIMERS};
