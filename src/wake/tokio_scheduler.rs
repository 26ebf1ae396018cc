//! Wake scheduler backed by tokio timers

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, Weak,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use tokio::{
    runtime::Handle,
    task::{self, JoinHandle},
    time::sleep,
};
use tracing::{debug, info, warn};

use super::{WakeListener, WakeScheduler, WakeToken};
use crate::{error::WakeError, timer::Clock};

/// Wake scheduler running one tokio task per pending wake.
///
/// Each task sleeps until the wall-clock target, as read from the injected
/// clock at programming time, and then runs whichever listener is registered
/// under its token on the blocking pool.
#[derive(Clone)]
pub struct TokioWakeScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    runtime: Handle,
    clock: Arc<dyn Clock>,
    pending: Mutex<HashMap<WakeToken, PendingWake>>,
    listeners: Mutex<HashMap<WakeToken, WakeListener>>,
    closed: AtomicBool,
    next_id: AtomicU64,
}

struct PendingWake {
    id: u64,
    at: DateTime<Utc>,
    handle: JoinHandle<()>,
}

impl TokioWakeScheduler {
    /// Create a scheduler spawning on the current tokio runtime.
    ///
    /// Panics when called outside a runtime, like `tokio::spawn`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_handle(Handle::current(), clock)
    }

    pub fn with_handle(runtime: Handle, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                runtime,
                clock,
                pending: Mutex::new(HashMap::new()),
                listeners: Mutex::new(HashMap::new()),
                closed: AtomicBool::new(false),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Instant the wake for `token` is armed for, if one is pending
    pub fn pending_at(&self, token: &WakeToken) -> Option<DateTime<Utc>> {
        self.inner.pending().get(token).map(|wake| wake.at)
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending().len()
    }

    pub fn has_listener(&self, token: &WakeToken) -> bool {
        self.inner.listeners().contains_key(token)
    }

    /// Disarm every pending wake and refuse further programming
    pub fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut pending = self.inner.pending();
        let count = pending.len();
        for (_, wake) in pending.drain() {
            wake.handle.abort();
        }
        drop(pending);

        self.inner.listeners().clear();
        info!("Wake scheduler shut down, {} pending wakes cancelled", count);
    }
}

impl Inner {
    fn pending(&self) -> MutexGuard<'_, HashMap<WakeToken, PendingWake>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn listeners(&self) -> MutexGuard<'_, HashMap<WakeToken, WakeListener>> {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Claim the wake once its sleep completes, returning the listener to
    /// run. `None` when the wake was replaced or cancelled meanwhile, or when
    /// nobody listens.
    fn take_due(&self, token: &WakeToken, id: u64) -> Option<WakeListener> {
        {
            let mut pending = self.pending();
            match pending.get(token) {
                Some(wake) if wake.id == id => {
                    pending.remove(token);
                }
                _ => return None,
            }
        }

        let listener = self.listeners().get(token).cloned();
        if listener.is_none() {
            debug!("Wake {} fired with no listener, dropped", token);
        }
        listener
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let pending = self.pending.get_mut().unwrap_or_else(|e| e.into_inner());
        for (_, wake) in pending.drain() {
            wake.handle.abort();
        }
    }
}

impl WakeScheduler for TokioWakeScheduler {
    fn program(&self, token: &WakeToken, at: DateTime<Utc>) -> Result<(), WakeError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(WakeError::Closed(token.to_string()));
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let delay = (at - self.inner.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);

        // Hold the map while spawning so the task cannot deliver before its
        // entry exists.
        let mut pending = self.inner.pending();

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let task_token = token.clone();
        let handle = self.inner.runtime.spawn(async move {
            sleep(delay).await;
            let listener = match weak.upgrade() {
                Some(inner) => inner.take_due(&task_token, id),
                None => None,
            };

            // Listeners may touch the durable store
            if let Some(listener) = listener {
                debug!("Delivering wake {}", task_token);
                if let Err(e) = task::spawn_blocking(move || listener()).await {
                    warn!("Listener for wake {} failed: {}", task_token, e);
                }
            }
        });

        if let Some(previous) = pending.insert(token.clone(), PendingWake { id, at, handle }) {
            previous.handle.abort();
            debug!("Replaced pending wake {} (was {})", token, previous.at);
        }

        debug!("Programmed wake {} at {} (in {:?})", token, at, delay);
        Ok(())
    }

    fn cancel(&self, token: &WakeToken) -> Result<(), WakeError> {
        if let Some(wake) = self.inner.pending().remove(token) {
            wake.handle.abort();
            debug!("Cancelled wake {} armed for {}", token, wake.at);
        }
        Ok(())
    }

    fn register_listener(&self, token: &WakeToken, listener: WakeListener) -> Result<(), WakeError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(WakeError::Closed(token.to_string()));
        }

        if self.inner.listeners().insert(token.clone(), listener).is_some() {
            warn!("Listener for wake {} replaced", token);
        }
        Ok(())
    }

    fn deregister_listener(&self, token: &WakeToken) -> Result<(), WakeError> {
        self.inner.listeners().remove(token);
        Ok(())
    }
}

impl std::fmt::Debug for TokioWakeScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioWakeScheduler")
            .field("pending", &self.pending_count())
            .field("closed", &self.inner.closed.load(Ordering::SeqCst))
            .finish()
    }
}
