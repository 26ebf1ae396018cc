//! Durable timer state: the active timer plus the popularity map

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::timer::Timer;

/// Everything that survives a restart
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedState {
    /// The single tracked timer, `None` when there is none
    pub active: Option<Timer>,
    /// Duration in minutes mapped to how often it was started
    pub popular: BTreeMap<u32, u32>,
}

impl PersistedState {
    pub fn new(active: Option<Timer>, popular: BTreeMap<u32, u32>) -> Self {
        Self { active, popular }
    }

    /// Active timer as seen at `now`; an expired running timer reads as absent
    pub fn active_at(&self, now: DateTime<Utc>) -> Option<Timer> {
        self.active.filter(|timer| !timer.is_expired(now))
    }

    /// Copy with `active` replaced
    pub fn with_active(&self, active: Option<Timer>) -> Self {
        Self {
            active,
            popular: self.popular.clone(),
        }
    }

    /// Copy with one more use recorded for `minutes`
    pub fn with_use_of(&self, minutes: u32) -> Self {
        let mut popular = self.popular.clone();
        let count = popular.entry(minutes).or_insert(0);
        *count = count.saturating_add(1);

        Self {
            active: self.active,
            popular,
        }
    }

    /// Copy without `minutes` in the popularity map
    pub fn without_popular(&self, minutes: u32) -> Self {
        let mut popular = self.popular.clone();
        popular.remove(&minutes);

        Self {
            active: self.active,
            popular,
        }
    }

    /// Popular durations ordered by use count, most used first.
    ///
    /// Equal counts are ordered by ascending minutes so the list is stable.
    pub fn ranked_popular(&self, limit: usize) -> Vec<(u32, u32)> {
        let mut ranked: Vec<(u32, u32)> = self
            .popular
            .iter()
            .map(|(&minutes, &count)| (minutes, count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(limit);
        ranked
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
    fn expired_running_timer_reads_as_absent() {
        let state = PersistedState::new(Some(Timer::running(at(5_000))), BTreeMap::new());

        assert!(state.active_at(at(4_000)).is_some());
        assert!(state.active_at(at(5_000)).is_some());
        assert!(state.active_at(at(5_001)).is_none());
        // Still physically present
        assert!(state.active.is_some());
    }

    #[test]
    fn paused_timer_never_expires() {
        let paused = Timer::paused(TimeDelta::seconds(10)).unwrap();
        let state = PersistedState::new(Some(paused), BTreeMap::new());
        assert_eq!(state.active_at(at(i64::from(u32::MAX))), Some(paused));
    }

    #[test]
    fn use_counts_accumulate_without_touching_the_original() {
        let state = PersistedState::default();
        let once = state.with_use_of(5);
        let twice = once.with_use_of(5).with_use_of(10);

        assert!(state.popular.is_empty());
        assert_eq!(once.popular.get(&5), Some(&1));
        assert_eq!(twice.popular.get(&5), Some(&2));
        assert_eq!(twice.popular.get(&10), Some(&1));
    }

    #[test]
    fn ranking_orders_by_count_then_minutes() {
        let popular = BTreeMap::from([(1, 2), (5, 7), (10, 2), (25, 1), (45, 7)]);
        let state = PersistedState::new(None, popular);

        assert_eq!(
            state.ranked_popular(4),
            vec![(5, 7), (45, 7), (1, 2), (10, 2)]
        );
        assert!(state.ranked_popular(0).is_empty());
    }

    #[test]
    fn forgetting_a_missing_entry_changes_nothing() {
        let state = PersistedState::default().with_use_of(3);
        assert_eq!(state.without_popular(99), state);
        assert!(state.without_popular(3).popular.is_empty());
    }
}
