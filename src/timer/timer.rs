//! Immutable countdown snapshot

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::Serialize;

use crate::error::{Error, Result};

/// A single countdown, either running toward an instant or paused with a
/// frozen remaining duration.
///
/// Values never change in place: `to_running` and `to_paused` return new
/// timers. Instants and durations are kept at millisecond precision, which is
/// the precision they are persisted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    kind: TimerKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Running { target_time: DateTime<Utc> },
    Paused { time_left: TimeDelta },
}

/// Serializable view of a timer at a given instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerView {
    pub running: bool,
    pub target_time: Option<DateTime<Utc>>,
    pub time_left_ms: i64,
}

impl Timer {
    /// Create a running timer anchored to `target_time`.
    ///
    /// The target may already be in the past, in which case the timer is
    /// expired.
    pub fn running(target_time: DateTime<Utc>) -> Self {
        Self {
            kind: TimerKind::Running {
                target_time: target_time.trunc_subsecs(3),
            },
        }
    }

    /// Create a paused timer holding `time_left`.
    ///
    /// Fails if less than one millisecond is left.
    pub fn paused(time_left: TimeDelta) -> Result<Self> {
        let time_left = TimeDelta::milliseconds(time_left.num_milliseconds());
        if time_left <= TimeDelta::zero() {
            return Err(Error::InvalidArgument(format!(
                "time left must be greater than zero, got {}ms",
                time_left.num_milliseconds()
            )));
        }

        Ok(Self {
            kind: TimerKind::Paused { time_left },
        })
    }

    pub fn is_running(&self) -> bool {
        matches!(self.kind, TimerKind::Running { .. })
    }

    pub fn is_paused(&self) -> bool {
        !self.is_running()
    }

    /// Target instant of a running timer, `None` while paused
    pub fn target_time(&self) -> Option<DateTime<Utc>> {
        match self.kind {
            TimerKind::Running { target_time } => Some(target_time),
            TimerKind::Paused { .. } => None,
        }
    }

    /// Stored remaining time of a paused timer, `None` while running
    pub fn frozen_time_left(&self) -> Option<TimeDelta> {
        match self.kind {
            TimerKind::Running { .. } => None,
            TimerKind::Paused { time_left } => Some(time_left),
        }
    }

    /// Remaining time as seen at `now`; negative once a running timer expired
    pub fn time_left(&self, now: DateTime<Utc>) -> TimeDelta {
        match self.kind {
            TimerKind::Running { target_time } => target_time - now,
            TimerKind::Paused { time_left } => time_left,
        }
    }

    /// True for a running timer whose target lies strictly before `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_running() && self.time_left(now) < TimeDelta::zero()
    }

    /// Resume counting down from `now`. No-op for a running timer.
    ///
    /// Fails when `now + time_left` is not a representable instant.
    pub fn to_running(self, now: DateTime<Utc>) -> Result<Timer> {
        match self.kind {
            TimerKind::Running { .. } => Ok(self),
            TimerKind::Paused { time_left } => now
                .checked_add_signed(time_left)
                .map(Timer::running)
                .ok_or_else(|| {
                    Error::InvalidArgument(format!(
                        "time left {}ms runs past the last representable instant",
                        time_left.num_milliseconds()
                    ))
                }),
        }
    }

    /// Freeze the remaining time as of `now`. No-op for a paused timer.
    pub fn to_paused(self, now: DateTime<Utc>) -> Result<Timer> {
        match self.kind {
            TimerKind::Paused { .. } => Ok(self),
            TimerKind::Running { target_time } => {
                Timer::paused(target_time - now).map_err(|_| {
                    Error::IllegalState("cannot pause a timer that has no time left".to_string())
                })
            }
        }
    }

    pub fn view(&self, now: DateTime<Utc>) -> TimerView {
        TimerView {
            running: self.is_running(),
            target_time: self.target_time(),
            time_left_ms: self.time_left(now).num_milliseconds(),
        }
    }
}
