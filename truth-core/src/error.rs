//! Error types for Truth Engine operations

/// Result type for Truth Engine operations
pub type Result<T> = std::result::Result<T, TruthError>;

/// Error types for the history core
#[derive(Debug, thiserror::Error)]
pub enum TruthError {
    /// Input rejected before any state change
    #[error("Validation error: {0}")]
    Validation(String),

    /// A query is already pending
    #[error("A query is already in flight")]
    QueryInFlight,

    /// Import document is malformed
    #[error("Invalid file format: {0}")]
    Format(String),

    /// Durable store could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// The answer-producing collaborator failed
    #[error("{0}")]
    Remote(String),

    /// Clipboard collaborator failed
    #[error("Clipboard error: {0}")]
    Clipboard(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal invariant broken (poisoned lock, aborted task)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl TruthError {
    /// Reason text suitable for an `Error: …` history marker.
    pub fn reason(&self) -> String {
        match self {
            TruthError::Remote(message) | TruthError::Other(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<String> for TruthError {
    fn from(s: String) -> Self {
        TruthError::Other(s)
    }
}

impl From<&str> for TruthError {
    fn from(s: &str) -> Self {
        TruthError::Other(s.to_string())
    }
}
