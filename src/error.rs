//! Error types for the guide tour engine.

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Progress error: {0}")]
    Progress(#[from] ProgressError),

    #[error("Step configuration error: {0}")]
    Steps(#[from] StepConfigError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors talking to the remote progress store.
///
/// None of these reach the user as a blocking failure; the store logs them and
/// hands them back so a caller can decide to re-invoke.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    #[error("Progress request {operation} failed: {reason}")]
    Request { operation: String, reason: String },

    #[error("Progress request {operation} returned {status}: {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode progress response: {0}")]
    Decode(String),

    #[error("Invalid page id: {0:?}")]
    InvalidPageId(String),

    #[error("Session ended before {operation} completed")]
    SessionEnded { operation: String },
}

/// Errors loading static step configuration.
#[derive(Debug, thiserror::Error)]
pub enum StepConfigError {
    #[error("Failed to read step file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid step configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
