//! Orchestrates the active timer, its persistence and its expiry wake

use std::{collections::BTreeMap, sync::Arc};

use chrono::TimeDelta;
use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    state::{PersistedState, TimerStore},
    timer::{Clock, Timer},
    wake::{WakeScheduler, WakeToken},
};

/// Owns the persisted timer state of one entry point.
///
/// Every state change is written durably before the expiry wake is adjusted,
/// and in-memory state is only replaced once the write succeeded. Several
/// managers may share one store (for example the control surface and the
/// alarm handler); each must call [`TimerManager::refresh`] whenever it
/// regains control.
pub struct TimerManager {
    state: PersistedState,
    store: TimerStore,
    wake: Arc<dyn WakeScheduler>,
    clock: Arc<dyn Clock>,
    alarm_token: WakeToken,
}

impl TimerManager {
    /// Build a manager, loading the persisted state once
    pub fn new(store: TimerStore, wake: Arc<dyn WakeScheduler>, clock: Arc<dyn Clock>) -> Result<Self> {
        let state = store.load()?;
        debug!("Timer manager loaded state: {:?}", state);

        Ok(Self {
            state,
            store,
            wake,
            clock,
            alarm_token: WakeToken::expiry(),
        })
    }

    /// The active timer, or `None` when there is none or it already expired
    pub fn active_timer(&self) -> Option<Timer> {
        self.state.active_at(self.clock.now())
    }

    /// Snapshot of the popularity map
    pub fn popular_timers(&self) -> BTreeMap<u32, u32> {
        self.state.popular.clone()
    }

    /// Most used durations first, at most `limit` entries
    pub fn ranked_popular(&self, limit: usize) -> Vec<(u32, u32)> {
        self.state.ranked_popular(limit)
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Start a fresh running timer of `minutes` and count one use of it
    pub fn start_new_timer(&mut self, minutes: u32) -> Result<Timer> {
        if minutes == 0 {
            return Err(Error::InvalidArgument(
                "minutes have to be greater than zero".to_string(),
            ));
        }

        let timer = Timer::running(self.clock.now() + TimeDelta::minutes(i64::from(minutes)));
        let next = self.state.with_active(Some(timer)).with_use_of(minutes);

        self.commit(next)?;
        self.schedule_alarm(&timer)?;

        info!("Started new {} minute timer", minutes);
        Ok(timer)
    }

    /// Freeze the active timer. A paused timer is returned as is.
    pub fn pause_active_timer(&mut self) -> Result<Timer> {
        let now = self.clock.now();
        let timer = self
            .state
            .active_at(now)
            .ok_or_else(|| Error::IllegalState("there is no active timer to pause".to_string()))?;

        if timer.is_paused() {
            debug!("Active timer already paused");
            return Ok(timer);
        }

        let paused = timer.to_paused(now)?;
        self.commit(self.state.with_active(Some(paused)))?;
        self.cancel_outstanding_alarm()?;

        info!(
            "Paused active timer with {}ms left",
            paused.time_left(now).num_milliseconds()
        );
        Ok(paused)
    }

    /// Drop the active timer entirely
    pub fn stop_active_timer(&mut self) -> Result<()> {
        if self.active_timer().is_none() {
            return Err(Error::IllegalState(
                "there is no active timer to stop".to_string(),
            ));
        }

        self.commit(self.state.with_active(None))?;
        self.cancel_outstanding_alarm()?;

        info!("Stopped active timer");
        Ok(())
    }

    /// Resume a paused timer, making it the active one
    pub fn start_timer(&mut self, timer: Timer) -> Result<Timer> {
        if timer.is_running() {
            return Err(Error::IllegalState(
                "provided timer is already running".to_string(),
            ));
        }

        let running = timer.to_running(self.clock.now())?;
        self.commit(self.state.with_active(Some(running)))?;
        self.schedule_alarm(&running)?;

        info!("Resumed timer, target {:?}", running.target_time());
        Ok(running)
    }

    /// Remove `minutes` from the popularity map; absent entries are ignored
    pub fn forget_timer(&mut self, minutes: u32) -> Result<()> {
        if !self.state.popular.contains_key(&minutes) {
            debug!("Nothing to forget for {} minutes", minutes);
            return Ok(());
        }

        self.commit(self.state.without_popular(minutes))?;

        info!("Forgot {} minute timer", minutes);
        Ok(())
    }

    /// Reload state written by any entry point, discarding what is in memory
    pub fn refresh(&mut self) -> Result<()> {
        self.state = self.store.load()?;
        debug!("Refreshed timer state: {:?}", self.state);
        Ok(())
    }

    /// The persisted timer, including one that already expired
    pub fn stored_timer(&self) -> Option<Timer> {
        self.state.active
    }

    /// Bring the expiry wake in line with the loaded state.
    ///
    /// Wakes that lived in a previous process are gone after a restart, so a
    /// freshly started host arms the wake for a running timer and clears it
    /// otherwise.
    pub fn restore_alarm(&self) -> Result<()> {
        match self.active_timer() {
            Some(timer) if timer.is_running() => {
                self.schedule_alarm(&timer)?;
                info!("Restored expiry alarm for {:?}", timer.target_time());
            }
            _ => self.cancel_outstanding_alarm()?,
        }
        Ok(())
    }

    /// Persist `next` and adopt it only once the write is durable
    fn commit(&mut self, next: PersistedState) -> Result<()> {
        self.store.save(&next)?;
        self.state = next;
        Ok(())
    }

    fn schedule_alarm(&self, timer: &Timer) -> Result<()> {
        let target = timer.target_time().ok_or_else(|| {
            Error::IllegalState("alarm can only be scheduled for a running timer".to_string())
        })?;

        self.wake.program(&self.alarm_token, target)?;
        Ok(())
    }

    fn cancel_outstanding_alarm(&self) -> Result<()> {
        self.wake.cancel(&self.alarm_token)?;
        Ok(())
    }
}

impl std::fmt::Debug for TimerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerManager")
            .field("state", &self.state)
            .field("alarm_token", &self.alarm_token)
            .finish()
    }
}
