use thiserror::Error;

/// Centralized error type for the crate.
///
/// Expected backend failures (wrong credentials, unreachable host, paused
/// backend) never appear here — adapters normalize those into
/// `NzbResult { success: false, .. }` values. `NzbError` is reserved for
/// configuration mistakes and bug-class failures that should propagate.
#[derive(Error, Debug)]
pub enum NzbError {
    /// Missing or invalid connection configuration (e.g. empty API URL).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend returned a well-formed response that cannot be interpreted
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Type alias for Result with NzbError
pub type Result<T, E = NzbError> = std::result::Result<T, E>;
