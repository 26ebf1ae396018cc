//! Timer manager module
//! 
//! This module contains the orchestrator every collaborator calls to change
//! the active timer.

pub mod timer_manager;

// Re-export main types
pub use timer_manager::TimerManager;
