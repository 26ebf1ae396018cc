#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use chrono::{DateTime, Utc};
use wake_timer::{
    error::{StoreError, WakeError},
    routine::{PeriodicRoutine, TriggerCallback},
    state::{KeyValueStore, MemoryStore},
    wake::{WakeListener, WakeScheduler, WakeToken},
};

pub const T0_MS: i64 = 1_700_000_000_000;

pub fn at(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap()
}

/// One call made against [`RecordingWake`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakeCall {
    Program(WakeToken, DateTime<Utc>),
    Cancel(WakeToken),
    Register(WakeToken),
    Deregister(WakeToken),
}

#[derive(Default)]
struct WakeLog {
    pending: HashMap<WakeToken, DateTime<Utc>>,
    listeners: HashMap<WakeToken, WakeListener>,
    calls: Vec<WakeCall>,
}

/// Wake scheduler that records calls and only fires when told to
#[derive(Default)]
pub struct RecordingWake {
    log: Mutex<WakeLog>,
    closed: AtomicBool,
}

impl RecordingWake {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn pending_at(&self, token: &WakeToken) -> Option<DateTime<Utc>> {
        self.log.lock().unwrap().pending.get(token).copied()
    }

    pub fn has_listener(&self, token: &WakeToken) -> bool {
        self.log.lock().unwrap().listeners.contains_key(token)
    }

    pub fn listener(&self, token: &WakeToken) -> Option<WakeListener> {
        self.log.lock().unwrap().listeners.get(token).cloned()
    }

    pub fn calls(&self) -> Vec<WakeCall> {
        self.log.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.log.lock().unwrap().calls.clear();
    }

    /// Deliver the pending wake for `token`, as the system would at its
    /// target instant. Returns false when nothing was pending.
    pub fn fire(&self, token: &WakeToken) -> bool {
        let listener = {
            let mut log = self.log.lock().unwrap();
            if log.pending.remove(token).is_none() {
                return false;
            }
            log.listeners.get(token).cloned()
        };

        if let Some(listener) = listener {
            listener();
        }
        true
    }
}

impl WakeScheduler for RecordingWake {
    fn program(&self, token: &WakeToken, at: DateTime<Utc>) -> Result<(), WakeError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(WakeError::Closed(token.to_string()));
        }
        let mut log = self.log.lock().unwrap();
        log.pending.insert(token.clone(), at);
        log.calls.push(WakeCall::Program(token.clone(), at));
        Ok(())
    }

    fn cancel(&self, token: &WakeToken) -> Result<(), WakeError> {
        let mut log = self.log.lock().unwrap();
        log.pending.remove(token);
        log.calls.push(WakeCall::Cancel(token.clone()));
        Ok(())
    }

    fn register_listener(&self, token: &WakeToken, listener: WakeListener) -> Result<(), WakeError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(WakeError::Closed(token.to_string()));
        }
        let mut log = self.log.lock().unwrap();
        log.listeners.insert(token.clone(), listener);
        log.calls.push(WakeCall::Register(token.clone()));
        Ok(())
    }

    fn deregister_listener(&self, token: &WakeToken) -> Result<(), WakeError> {
        let mut log = self.log.lock().unwrap();
        log.listeners.remove(token);
        log.calls.push(WakeCall::Deregister(token.clone()));
        Ok(())
    }
}

/// Memory store whose reads and writes can be made to fail
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    writes: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner.get(key).unwrap()
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Read {
                key: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk unplugged"),
            });
        }
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Write {
                key: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            });
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, value)
    }
}

/// Callback counting its invocations
pub fn counting_callback() -> (TriggerCallback, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    (
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
        count,
    )
}

/// Routine that only records whether it is started
#[derive(Default)]
pub struct FlagRoutine {
    started: AtomicBool,
    starts: AtomicUsize,
}

impl FlagRoutine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

impl PeriodicRoutine for FlagRoutine {
    fn start(&self) -> wake_timer::Result<()> {
        if !self.started.swap(true, Ordering::SeqCst) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn stop(&self) -> wake_timer::Result<()> {
        self.started.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}
