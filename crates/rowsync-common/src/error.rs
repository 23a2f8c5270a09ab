//! Error types for rowsync
//!
//! The taxonomy separates fatal startup problems (configuration) from
//! recoverable runtime problems (store, state, transform). Nothing in the
//! recoverable group is allowed to escape a poll cycle.

use thiserror::Error;

/// Result type alias for rowsync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Main error type for rowsync
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration is missing or invalid. Fatal: surfaced at startup,
    /// the daemon never enters the poll loop.
    #[error("Configuration error: {0}. Check your environment variables or .env file.")]
    Config(String),

    /// The tabular store could not be read or written. Recoverable: the
    /// current poll cycle is aborted and retried after a backoff.
    #[error("Tabular store error: {0}")]
    Store(String),

    /// Persisted signature state is unreadable. Recoverable: treated as
    /// empty state, which can only cause duplicate copies, not data loss.
    #[error("State error: {0}")]
    State(String),

    /// A single row could not be transformed. Recoverable per row: the
    /// original cell text is kept and the rest of the cycle continues.
    #[error("Transform error: {0}")]
    Transform(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a state error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Create a transform error
    pub fn transform(msg: impl Into<String>) -> Self {
        Self::Transform(msg.into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SyncError::config("SPREADSHEET_ID is not set");
        assert!(err.to_string().contains("SPREADSHEET_ID"));

        let err = SyncError::store("source sheet unavailable");
        assert!(err.to_string().starts_with("Tabular store error"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: SyncError = io.into();
        assert!(matches!(err, SyncError::Io(_)));
    }
}
