use thiserror::Error;

/// Why the process-wide subscriber could not be installed.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log format {0:?} (expected text|json|journald)")]
    InvalidFormat(String),
    #[error("journald output needs linux and the `journald` feature")]
    JournaldNotSupported,
    #[error("a global subscriber is already installed")]
    AlreadyInitialized,
    #[error("cannot install subscriber: {0}")]
    InitializationFailed(String),
    #[error("invalid log filter directive {0:?}")]
    InvalidLogLevel(String),
}
