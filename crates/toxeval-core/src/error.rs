//! Error types for toxeval

/// Result type alias using toxeval's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for evaluation runs
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or malformed run configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Dataset loading or schema errors
    #[error("dataset error: {0}")]
    Dataset(String),

    /// Checkpoint could not be read or restored
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// Model construction or inference errors
    #[error("model error: {0}")]
    Model(String),

    /// Result or submission writing errors
    #[error("output error: {0}")]
    Output(String),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Delimited table errors
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new dataset error
    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    /// Create a new checkpoint error
    pub fn checkpoint(msg: impl Into<String>) -> Self {
        Self::Checkpoint(msg.into())
    }

    /// Create a new model error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new output error
    pub fn output(msg: impl Into<String>) -> Self {
        Self::Output(msg.into())
    }
}
