//! Wake-driven periodic routine for suspended or low-power operation

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use chrono::DateTime;
use tracing::{debug, warn};

use super::{drift::next_fire_ms, PeriodicRoutine, TriggerCallback};
use crate::{
    error::{Error, Result},
    timer::Clock,
    wake::{WakeListener, WakeScheduler, WakeToken},
};

/// Fires through the wake scheduler, so it keeps ticking while the process
/// would otherwise be idle.
///
/// Every instance owns a unique wake token; its listener is registered on
/// `start` and removed on `stop`. Delivery may be late, and a dropped wake is
/// simply skipped: the following fire is recomputed from the start instant.
pub struct BackgroundRoutine {
    shared: Arc<Shared>,
}

struct Shared {
    interval_ms: i64,
    token: WakeToken,
    wake: Arc<dyn WakeScheduler>,
    clock: Arc<dyn Clock>,
    callback: TriggerCallback,
    state: Mutex<RunState>,
}

#[derive(Default)]
struct RunState {
    generation: u64,
    start_ms: Option<i64>,
}

impl BackgroundRoutine {
    pub fn new(
        interval_ms: i64,
        wake: Arc<dyn WakeScheduler>,
        clock: Arc<dyn Clock>,
        callback: TriggerCallback,
    ) -> Result<Self> {
        if interval_ms <= 0 {
            return Err(Error::InvalidArgument(
                "interval has to be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            shared: Arc::new(Shared {
                interval_ms,
                token: WakeToken::unique("background-routine"),
                wake,
                clock,
                callback,
                state: Mutex::new(RunState::default()),
            }),
        })
    }

    /// Routing token of this instance's wakes
    pub fn token(&self) -> &WakeToken {
        &self.shared.token
    }

    pub fn interval_ms(&self) -> i64 {
        self.shared.interval_ms
    }
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn schedule_next(&self, start_ms: i64) -> Result<()> {
        let next_ms = next_fire_ms(start_ms, self.clock.now_ms(), self.interval_ms);
        let at = DateTime::from_timestamp_millis(next_ms).ok_or_else(|| {
            Error::IllegalState(format!("next fire {}ms is out of range", next_ms))
        })?;

        self.wake.program(&self.token, at)?;
        Ok(())
    }

    fn on_wake(&self, generation: u64) {
        let state = self.state();
        let start_ms = match state.start_ms {
            Some(start_ms) if state.generation == generation => start_ms,
            // Stopped, or restarted since this listener was registered
            _ => {
                debug!("Ignoring stale wake for {}", self.token);
                return;
            }
        };

        (self.callback)();

        if let Err(e) = self.schedule_next(start_ms) {
            warn!("Failed to schedule next background fire for {}: {}", self.token, e);
        }
    }
}

fn listener_for(shared: &Arc<Shared>, generation: u64) -> WakeListener {
    let weak: Weak<Shared> = Arc::downgrade(shared);
    Arc::new(move || {
        if let Some(shared) = weak.upgrade() {
            shared.on_wake(generation);
        }
    })
}

impl PeriodicRoutine for BackgroundRoutine {
    fn start(&self) -> Result<()> {
        let shared = &self.shared;
        let mut state = shared.state();
        if state.start_ms.is_some() {
            return Ok(());
        }

        let generation = state.generation + 1;
        shared
            .wake
            .register_listener(&shared.token, listener_for(shared, generation))?;

        let start_ms = shared.clock.now_ms();
        state.generation = generation;
        state.start_ms = Some(start_ms);

        (shared.callback)();

        if let Err(e) = shared.schedule_next(start_ms) {
            state.start_ms = None;
            if let Err(e) = shared.wake.deregister_listener(&shared.token) {
                warn!("Failed to deregister listener {}: {}", shared.token, e);
            }
            return Err(e);
        }

        debug!(
            "Background routine {} started, interval {}ms",
            shared.token, shared.interval_ms
        );
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        let shared = &self.shared;
        let mut state = shared.state();
        if state.start_ms.take().is_none() {
            return Ok(());
        }

        let cancelled = shared.wake.cancel(&shared.token);
        let deregistered = shared.wake.deregister_listener(&shared.token);
        cancelled?;
        deregistered?;

        debug!("Background routine {} stopped", shared.token);
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.shared.state().start_ms.is_some()
    }
}

impl Drop for BackgroundRoutine {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Failed to stop background routine on drop: {}", e);
        }
    }
}
