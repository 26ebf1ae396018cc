//! In-process periodic routine driven by the tokio timer

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{sleep, Instant},
};
use tracing::debug;

use super::{drift::delay_until_next, PeriodicRoutine, TriggerCallback};
use crate::error::{Error, Result};

/// Fires while the process is alive and scheduled, with sub-second precision
pub struct ForegroundRoutine {
    interval: Duration,
    runtime: Handle,
    shared: Arc<Shared>,
}

struct Shared {
    callback: TriggerCallback,
    state: Mutex<RunState>,
}

#[derive(Default)]
struct RunState {
    generation: u64,
    started_at: Option<Instant>,
    task: Option<JoinHandle<()>>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ForegroundRoutine {
    /// Create a routine on the current tokio runtime
    pub fn new(interval: Duration, callback: TriggerCallback) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::IllegalState(format!("foreground routine needs a tokio runtime: {}", e)))?;
        Self::with_handle(runtime, interval, callback)
    }

    pub fn with_handle(runtime: Handle, interval: Duration, callback: TriggerCallback) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::InvalidArgument(
                "interval has to be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            interval,
            runtime,
            shared: Arc::new(Shared {
                callback,
                state: Mutex::new(RunState::default()),
            }),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

async fn run(shared: Arc<Shared>, generation: u64, started_at: Instant, interval: Duration) {
    loop {
        sleep(delay_until_next(started_at.elapsed(), interval)).await;

        let state = shared.state();
        if state.generation != generation || state.started_at.is_none() {
            return;
        }
        (shared.callback)();
    }
}

impl PeriodicRoutine for ForegroundRoutine {
    fn start(&self) -> Result<()> {
        let mut state = self.shared.state();
        if state.started_at.is_some() {
            return Ok(());
        }

        let started_at = Instant::now();
        state.generation += 1;
        state.started_at = Some(started_at);

        (self.shared.callback)();

        let task = self.runtime.spawn(run(
            Arc::clone(&self.shared),
            state.generation,
            started_at,
            self.interval,
        ));
        state.task = Some(task);

        debug!("Foreground routine started, interval {:?}", self.interval);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        let mut state = self.shared.state();
        if state.started_at.take().is_none() {
            return Ok(());
        }

        if let Some(task) = state.task.take() {
            task.abort();
        }

        debug!("Foreground routine stopped");
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.shared.state().started_at.is_some()
    }
}

impl Drop for ForegroundRoutine {
    fn drop(&mut self) {
        if let Some(task) = self.shared.state().task.take() {
            task.abort();
        }
    }
}
