//! Background tasks module
//! 
//! This module contains the callbacks that run alongside the HTTP server: the
//! display tick and the expiry alarm handler.

pub mod countdown;
pub mod expiry_alarm;

// Re-export main functions
pub use countdown::{countdown_callback, publish_countdown};
pub use expiry_alarm::{register_expiry_alarm, ExpiryAlarmHandler};
