//! Countdown snapshot published on every display tick

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::timer::Timer;

/// What the display shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CountdownPhase {
    Idle,
    Running,
    Paused,
    Ringing,
}

/// Countdown state for rendering, rebuilt on every tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountdownState {
    pub phase: CountdownPhase,
    pub remaining_ms: Option<i64>,
    pub observed_at: Option<DateTime<Utc>>,
}

impl CountdownState {
    /// Create an idle countdown state
    pub fn new() -> Self {
        Self {
            phase: CountdownPhase::Idle,
            remaining_ms: None,
            observed_at: None,
        }
    }

    /// Derive the state from the active timer as seen at `now`.
    ///
    /// A ringing alarm takes precedence and shows zero time left.
    pub fn observe(active: Option<Timer>, ringing: bool, now: DateTime<Utc>) -> Self {
        let (phase, remaining_ms) = match active {
            _ if ringing => (CountdownPhase::Ringing, Some(0)),
            None => (CountdownPhase::Idle, None),
            Some(timer) => {
                let phase = if timer.is_running() {
                    CountdownPhase::Running
                } else {
                    CountdownPhase::Paused
                };
                (phase, Some(timer.time_left(now).num_milliseconds().max(0)))
            }
        };

        Self {
            phase,
            remaining_ms,
            observed_at: Some(now),
        }
    }

    /// Check if a timer is counting down
    pub fn is_running(&self) -> bool {
        self.phase == CountdownPhase::Running
    }

    /// Whole seconds left, rounded up the way a countdown display shows them
    pub fn remaining_seconds(&self) -> Option<i64> {
        self.remaining_ms.map(|ms| (ms + 999) / 1000)
    }
}

impl Default for CountdownState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn observes_running_and_paused_timers() {
        let running = CountdownState::observe(Some(Timer::running(at(10_500))), false, at(1_000));
        assert!(running.is_running());
        assert_eq!(running.remaining_ms, Some(9_500));
        assert_eq!(running.remaining_seconds(), Some(10));

        let paused = Timer::paused(TimeDelta::seconds(42)).unwrap();
        let paused = CountdownState::observe(Some(paused), false, at(1_000));
        assert_eq!(paused.phase, CountdownPhase::Paused);
        assert_eq!(paused.remaining_seconds(), Some(42));
    }

    #[test]
    fn ringing_overrides_everything() {
        let state = CountdownState::observe(None, true, at(0));
        assert_eq!(state.phase, CountdownPhase::Ringing);
        assert_eq!(state.remaining_ms, Some(0));

        let idle = CountdownState::observe(None, false, at(0));
        assert_eq!(idle.phase, CountdownPhase::Idle);
        assert_eq!(idle.remaining_seconds(), None);
    }
}
