//! Error types shared by the timer core

use thiserror::Error;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error returned by timer operations
#[derive(Debug, Error)]
pub enum Error {
    /// The caller passed a value the operation can never accept
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation does not apply to the current timer state
    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Wake(#[from] WakeError),
}

impl Error {
    /// True for caller mistakes (bad argument or wrong state)
    pub fn is_precondition(&self) -> bool {
        matches!(self, Error::InvalidArgument(_) | Error::IllegalState(_))
    }
}

/// Failures of the durable key-value slot
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read slot `{key}`: {source}")]
    Read {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write slot `{key}`: {source}")]
    Write {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("persisted state under `{key}` is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("failed to encode persisted state: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("invalid slot key `{0}`")]
    InvalidKey(String),
}

impl StoreError {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, StoreError::Corrupt { .. })
    }
}

/// Failures of the wake-scheduling facility
#[derive(Debug, Error)]
pub enum WakeError {
    #[error("wake scheduler is shut down, cannot program `{0}`")]
    Closed(String),
}
