//! Persisted state codec bound to a key-value slot

use std::sync::Arc;

use tracing::{debug, warn};

use super::{codec, KeyValueStore, PersistedState};
use crate::error::StoreError;

/// Slot holding the encoded state
pub const KEY_TIMERS: &str = "timers";

/// Saves and loads [`PersistedState`] under [`KEY_TIMERS`]
#[derive(Clone)]
pub struct TimerStore {
    backend: Arc<dyn KeyValueStore>,
}

impl TimerStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Encode and write `state`, returning once the write is durable
    pub fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        let blob = codec::encode(state)?;
        self.backend.put(KEY_TIMERS, &blob)?;

        debug!("Saved timer state: {}", blob);
        Ok(())
    }

    /// Read the current state, defaulting when nothing was ever saved
    pub fn load(&self) -> Result<PersistedState, StoreError> {
        let blob = match self.backend.get(KEY_TIMERS)? {
            Some(blob) if !blob.trim().is_empty() => blob,
            _ => {
                debug!("No persisted timer state, using defaults");
                return Ok(PersistedState::default());
            }
        };

        codec::decode(&blob).map_err(|reason| {
            warn!("Persisted timer state is corrupt: {}", reason);
            StoreError::Corrupt {
                key: KEY_TIMERS.to_string(),
                reason,
            }
        })
    }
}

impl std::fmt::Debug for TimerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerStore").field("key", &KEY_TIMERS).finish()
    }
}
