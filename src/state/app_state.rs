//! Main application state management

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Instant,
};
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::{AlarmState, CountdownState, PersistedState, TimerStore};
use crate::{
    config::Config,
    error::{Error, Result},
    manager::TimerManager,
    routine::{BackgroundRoutine, ForegroundRoutine, PeriodicRoutine, RoutineSwitch},
    tasks::{countdown_callback, register_expiry_alarm, ExpiryAlarmHandler},
    timer::Clock,
    wake::{TokioWakeScheduler, WakeScheduler},
};

/// Shared handles the display tick reads from
#[derive(Clone)]
pub struct DisplayContext {
    pub manager: Arc<Mutex<TimerManager>>,
    pub alarm: Arc<AlarmState>,
    pub clock: Arc<dyn Clock>,
    pub countdown_tx: Arc<watch::Sender<CountdownState>>,
}

/// Main application state shared by the HTTP handlers
pub struct AppState {
    /// Timer manager of the control surface
    pub manager: Arc<Mutex<TimerManager>>,
    /// Tick source selection for the display
    pub display: Mutex<RoutineSwitch>,
    /// Ringing window of the expiry alarm
    pub alarm: Arc<AlarmState>,
    pub wake: TokioWakeScheduler,
    pub clock: Arc<dyn Clock>,
    /// Latest countdown published by the display tick
    pub countdown_tx: Arc<watch::Sender<CountdownState>>,
    /// Keep the receiver alive to prevent channel closure
    pub countdown_rx: watch::Receiver<CountdownState>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Default length of the popular list
    pub popular_limit: usize,
    /// Last action tracking
    pub last_action: Mutex<Option<String>>,
    pub last_action_time: Mutex<Option<DateTime<Utc>>>,
}

impl AppState {
    /// Build the manager for an entry point, applying the corrupt-state policy.
    ///
    /// With `reset_corrupt` a corrupt blob is logged and overwritten with the
    /// default state; otherwise the decode error is returned.
    pub fn open_manager(
        store: TimerStore,
        wake: Arc<dyn WakeScheduler>,
        clock: Arc<dyn Clock>,
        reset_corrupt: bool,
    ) -> Result<TimerManager> {
        match TimerManager::new(store.clone(), Arc::clone(&wake), Arc::clone(&clock)) {
            Err(Error::Store(e)) if e.is_corrupt() && reset_corrupt => {
                error!("{}; resetting to the default state", e);
                store.save(&PersistedState::default())?;
                TimerManager::new(store, wake, clock)
            }
            other => other,
        }
    }

    /// Create the display context and its countdown channel
    pub fn display_context(
        manager: Arc<Mutex<TimerManager>>,
        alarm: Arc<AlarmState>,
        clock: Arc<dyn Clock>,
    ) -> (DisplayContext, watch::Receiver<CountdownState>) {
        let (countdown_tx, countdown_rx) = watch::channel(CountdownState::new());
        let context = DisplayContext {
            manager,
            alarm,
            clock,
            countdown_tx: Arc::new(countdown_tx),
        };
        (context, countdown_rx)
    }

    /// Assemble the state from its already wired parts
    pub fn new(
        context: DisplayContext,
        countdown_rx: watch::Receiver<CountdownState>,
        display: RoutineSwitch,
        wake: TokioWakeScheduler,
        port: u16,
        host: String,
        popular_limit: usize,
    ) -> Self {
        Self {
            manager: context.manager,
            display: Mutex::new(display),
            alarm: context.alarm,
            wake,
            clock: context.clock,
            countdown_tx: context.countdown_tx,
            countdown_rx,
            start_time: Instant::now(),
            port,
            host,
            popular_limit,
            last_action: Mutex::new(None),
            last_action_time: Mutex::new(None),
        }
    }

    /// Wire every component of the daemon around `store`.
    ///
    /// Loads the state, re-arms the expiry wake lost with the previous
    /// process, registers the alarm handler and prepares both display
    /// routines. The display starts paused in foreground mode.
    pub fn assemble(
        config: &Config,
        store: TimerStore,
        wake: TokioWakeScheduler,
        clock: Arc<dyn Clock>,
    ) -> Result<Arc<Self>> {
        let wake_dyn: Arc<dyn WakeScheduler> = Arc::new(wake.clone());

        let manager = Self::open_manager(
            store.clone(),
            Arc::clone(&wake_dyn),
            Arc::clone(&clock),
            config.reset_corrupt_state,
        )?;
        let alarm = Arc::new(AlarmState::new(config.ring_duration()));

        // The alarm handler is a separate entry point with its own memory
        let alarm_manager = TimerManager::new(store, Arc::clone(&wake_dyn), Arc::clone(&clock))?;
        let handler = Arc::new(ExpiryAlarmHandler::new(alarm_manager, Arc::clone(&alarm)));
        register_expiry_alarm(wake_dyn.as_ref(), handler)?;

        manager.restore_alarm()?;
        let manager = Arc::new(Mutex::new(manager));

        let (context, countdown_rx) =
            Self::display_context(manager, alarm, Arc::clone(&clock));
        let callback = countdown_callback(context.clone());

        let foreground: Arc<dyn PeriodicRoutine> = Arc::new(ForegroundRoutine::new(
            config.foreground_interval(),
            Arc::clone(&callback),
        )?);
        let background: Arc<dyn PeriodicRoutine> = Arc::new(BackgroundRoutine::new(
            config.background_interval_ms(),
            wake_dyn,
            clock,
            callback,
        )?);

        Ok(Arc::new(Self::new(
            context,
            countdown_rx,
            RoutineSwitch::new(foreground, background),
            wake,
            config.port,
            config.host.clone(),
            config.popular_limit,
        )))
    }

    /// Lock the manager and reload it, since another entry point may have
    /// written the store since the last request
    pub fn refreshed_manager(&self) -> Result<MutexGuard<'_, TimerManager>> {
        let mut manager = self.manager.lock().map_err(|e| {
            Error::IllegalState(format!("Failed to lock timer manager: {}", e))
        })?;
        manager.refresh()?;
        Ok(manager)
    }

    /// Lock the display switch
    pub fn display(&self) -> Result<MutexGuard<'_, RoutineSwitch>> {
        self.display
            .lock()
            .map_err(|e| Error::IllegalState(format!("Failed to lock display: {}", e)))
    }

    /// Record the last action for status reporting
    pub fn record_action(&self, action: &str) {
        info!("Action: {}", action);
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }
    }

    /// Get the latest published countdown
    pub fn countdown(&self) -> CountdownState {
        self.countdown_rx.borrow().clone()
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }

    /// Stop the display routines and disarm every wake
    pub fn shutdown(&self) {
        match self.display() {
            Ok(mut display) => {
                if let Err(e) = display.pause() {
                    warn!("Failed to pause display on shutdown: {}", e);
                }
            }
            Err(e) => warn!("{}", e),
        }
        self.wake.shutdown();
    }
}
