//! Wire format of the persisted state blob
//!
//! Instants are milliseconds since the Unix epoch and durations are
//! milliseconds, so the blob is independent of locale and time zone:
//!
//! ```text
//! {"active":{"kind":"running","targetTimeMs":1700000000000},"popular":{"5":3}}
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use super::PersistedState;
use crate::timer::Timer;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum TimerRecord {
    Running {
        #[serde(rename = "targetTimeMs")]
        target_time_ms: i64,
    },
    Paused {
        #[serde(rename = "timeLeftMs")]
        time_left_ms: i64,
    },
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateRecord {
    #[serde(default)]
    active: Option<TimerRecord>,
    #[serde(default)]
    popular: BTreeMap<u32, u32>,
}

/// Serialize the state into its JSON blob
pub fn encode(state: &PersistedState) -> Result<String, serde_json::Error> {
    let record = StateRecord {
        active: state.active.as_ref().map(timer_to_record),
        popular: state.popular.clone(),
    };

    serde_json::to_string(&record)
}

/// Parse a JSON blob back into state.
///
/// The error string describes why the blob was rejected.
pub fn decode(blob: &str) -> Result<PersistedState, String> {
    let record: StateRecord =
        serde_json::from_str(blob).map_err(|e| format!("invalid JSON: {}", e))?;

    if let Some((minutes, count)) = record
        .popular
        .iter()
        .find(|&(&minutes, &count)| minutes == 0 || count == 0)
    {
        return Err(format!(
            "popularity entry {} -> {} must be positive",
            minutes, count
        ));
    }

    let active = record.active.map(record_to_timer).transpose()?;

    Ok(PersistedState::new(active, record.popular))
}

fn timer_to_record(timer: &Timer) -> TimerRecord {
    match (timer.target_time(), timer.frozen_time_left()) {
        (Some(target_time), _) => TimerRecord::Running {
            target_time_ms: target_time.timestamp_millis(),
        },
        (None, time_left) => TimerRecord::Paused {
            time_left_ms: time_left.unwrap_or_else(TimeDelta::zero).num_milliseconds(),
        },
    }
}

fn record_to_timer(record: TimerRecord) -> Result<Timer, String> {
    match record {
        TimerRecord::Running { target_time_ms } => DateTime::from_timestamp_millis(target_time_ms)
            .map(Timer::running)
            .ok_or_else(|| format!("target time {}ms is out of range", target_time_ms)),
        TimerRecord::Paused { time_left_ms } => {
            if time_left_ms <= 0 {
                return Err(format!("paused time left must be positive, got {}ms", time_left_ms));
            }
            TimeDelta::try_milliseconds(time_left_ms)
                .ok_or_else(|| format!("time left {}ms is out of range", time_left_ms))
                .and_then(|time_left| Timer::paused(time_left).map_err(|e| e.to_string()))
        }
    }
}
