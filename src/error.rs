use std::io;
use thiserror::Error;

/// Error type for taskpool operations.
#[derive(Error, Debug)]
pub enum PoolError {
    /// IO error from spawning a worker thread.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A value was extracted as a type other than the one stored.
    #[error("type mismatch: expected `{expected}`, value holds `{actual}`")]
    TypeMismatch {
        /// The type the caller asked for.
        expected: &'static str,
        /// The type the value actually holds.
        actual: &'static str,
    },

    /// Extraction attempted on a value that holds nothing.
    #[error("value is empty")]
    Empty,

    /// The pool is already running and can no longer be configured.
    #[error("pool is already started")]
    AlreadyStarted,

    /// A configuration value was rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Result type alias for taskpool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
