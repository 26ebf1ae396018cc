//! Display tick: publishes the countdown the UI renders

use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::{
    routine::TriggerCallback,
    state::{app_state::DisplayContext, CountdownState},
};

/// Read the active timer and publish what the display should show
pub fn publish_countdown(context: &DisplayContext) {
    let now = context.clock.now();

    // Never reload here: the tick only renders what this entry point knows
    let active = match context.manager.lock() {
        Ok(manager) => manager.active_timer(),
        Err(e) => {
            error!("Failed to lock timer manager: {}", e);
            return;
        }
    };

    let countdown = CountdownState::observe(active, context.alarm.is_ringing(now), now);
    debug!("Countdown tick: {:?}", countdown);

    if let Err(e) = context.countdown_tx.send(countdown) {
        warn!("Failed to send countdown update: {}", e);
    }
}

/// Callback for the display routines
pub fn countdown_callback(context: DisplayContext) -> TriggerCallback {
    let context = Arc::new(context);
    Arc::new(move || publish_countdown(&context))
}
