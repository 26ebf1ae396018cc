//! Wake scheduling module
//! 
//! This module contains the wake facility contract and its tokio-backed
//! implementation.

pub mod scheduler;
pub mod tokio_scheduler;

// Re-export main types
pub use scheduler::{WakeListener, WakeScheduler, WakeToken};
pub use tokio_scheduler::TokioWakeScheduler;
