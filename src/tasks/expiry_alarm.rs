//! Expiry alarm entry point

use std::sync::{Arc, Mutex};
use chrono::TimeDelta;
use tracing::{error, info, warn};

use crate::{
    error::Result,
    manager::TimerManager,
    state::AlarmState,
    wake::{WakeScheduler, WakeToken},
};

/// Wakes may land slightly before the wall-clock target
const EXPIRY_SLACK_MS: i64 = 500;

/// Handles the expiry wake with a manager of its own.
///
/// It shares the durable store with the control surface but not its memory,
/// so every wake starts with a refresh.
pub struct ExpiryAlarmHandler {
    manager: Mutex<TimerManager>,
    alarm: Arc<AlarmState>,
}

impl ExpiryAlarmHandler {
    pub fn new(manager: TimerManager, alarm: Arc<AlarmState>) -> Self {
        Self {
            manager: Mutex::new(manager),
            alarm,
        }
    }

    /// Ring when the stored timer has run out; anything else means the timer
    /// was changed elsewhere after the wake was armed.
    pub fn on_wake(&self) {
        let mut manager = match self.manager.lock() {
            Ok(manager) => manager,
            Err(e) => {
                error!("Failed to lock alarm manager: {}", e);
                return;
            }
        };

        if let Err(e) = manager.refresh() {
            error!("Failed to refresh timer state on expiry wake: {}", e);
            return;
        }

        let now = manager.clock().now();
        match manager.stored_timer() {
            Some(timer) if timer.is_running() && timer.time_left(now) <= TimeDelta::milliseconds(EXPIRY_SLACK_MS) => {
                info!("Timer expired at {:?}", timer.target_time());
                self.alarm.ring(now);
            }
            Some(timer) => warn!("Expiry wake for a timer that is still live: {:?}", timer),
            None => warn!("Expiry wake with no stored timer, ignoring"),
        }
    }
}

/// Route expiry wakes to `handler`
pub fn register_expiry_alarm(
    wake: &dyn WakeScheduler,
    handler: Arc<ExpiryAlarmHandler>,
) -> Result<()> {
    wake.register_listener(&WakeToken::expiry(), Arc::new(move || handler.on_wake()))?;
    info!("Expiry alarm handler registered");
    Ok(())
}
