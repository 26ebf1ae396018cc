//! Ringing window of an expired timer's alarm

use std::sync::Mutex;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::info;

/// Tracks whether the expiry alarm is currently ringing
#[derive(Debug)]
pub struct AlarmState {
    ring_for: TimeDelta,
    ringing_until: Mutex<Option<DateTime<Utc>>>,
}

impl AlarmState {
    pub fn new(ring_for: TimeDelta) -> Self {
        Self {
            ring_for,
            ringing_until: Mutex::new(None),
        }
    }

    /// Start ringing from `now`; a ringing alarm is left as it is
    pub fn ring(&self, now: DateTime<Utc>) {
        let mut until = self.lock();
        if until.map_or(true, |end| end <= now) {
            *until = Some(now + self.ring_for);
            info!("Alarm ringing until {}", now + self.ring_for);
        }
    }

    /// Stop ringing. Returns whether the alarm was ringing.
    pub fn dismiss(&self) -> bool {
        let was_ringing = self.lock().take().is_some();
        if was_ringing {
            info!("Alarm dismissed");
        }
        was_ringing
    }

    /// Whether the alarm rings at `now`, ending it once its window passed
    pub fn is_ringing(&self, now: DateTime<Utc>) -> bool {
        let mut until = self.lock();
        match *until {
            Some(end) if end <= now => {
                *until = None;
                info!("Alarm stopped ringing");
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<DateTime<Utc>>> {
        self.ringing_until.lock().unwrap_or_else(|e| e.into_inner())
    }
}
