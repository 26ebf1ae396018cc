//! Wake-scheduling facility consumed by the timer core

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use chrono::{DateTime, Utc};

use crate::error::WakeError;

/// Callback run when a wake registered under a token fires
pub type WakeListener = Arc<dyn Fn() + Send + Sync>;

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

/// Routing key tying a programmed wake to its listener
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WakeToken(String);

impl WakeToken {
    /// Token of the one-shot wake armed for the active timer's expiry
    pub const EXPIRY: &'static str = "timer-expiry";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn expiry() -> Self {
        Self::new(Self::EXPIRY)
    }

    /// Token unique to this process and call, for per-instance routing
    pub fn unique(prefix: &str) -> Self {
        let id = NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed);
        Self(format!("{}.{}.{}", prefix, std::process::id(), id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WakeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A system-level wake source able to call back at a wall-clock instant.
///
/// At most one wake is pending per token: programming a token again replaces
/// its pending wake. Delivery goes to the listener registered under the same
/// token at the moment the wake fires; a wake with no listener is dropped.
pub trait WakeScheduler: Send + Sync {
    /// Arm an exact one-shot wake at `at`, replacing any pending one
    fn program(&self, token: &WakeToken, at: DateTime<Utc>) -> Result<(), WakeError>;

    /// Disarm the pending wake for `token`, if any
    fn cancel(&self, token: &WakeToken) -> Result<(), WakeError>;

    /// Route wakes for `token` to `listener`, replacing any previous listener
    fn register_listener(&self, token: &WakeToken, listener: WakeListener) -> Result<(), WakeError>;

    /// Stop routing wakes for `token`
    fn deregister_listener(&self, token: &WakeToken) -> Result<(), WakeError>;
}
