//! Error types for Modgate

/// Result type alias using Modgate's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for moderation pipeline operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Detector execution errors
    #[error("detector error: {0}")]
    Detector(String),

    /// Rule validation or decoding errors
    #[error("rule error: {0}")]
    Rule(String),

    /// Rule store errors
    #[error("store error: {0}")]
    Store(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Detector inference exceeded its soft timeout
    #[error("operation timed out")]
    Timeout,

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new detector error
    pub fn detector(msg: impl Into<String>) -> Self {
        Self::Detector(msg.into())
    }

    /// Create a new rule error
    pub fn rule(msg: impl Into<String>) -> Self {
        Self::Rule(msg.into())
    }

    /// Create a new store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
