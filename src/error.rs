use thiserror::Error;

/// Result type for C51 operations
pub type Result<T> = std::result::Result<T, C51Error>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum C51Error {
    /// Invalid configuration value (support bounds, atom count, buffer sizes, ...)
    #[error("Invalid configuration '{name}': {reason}")]
    Configuration {
        name: String,
        reason: String,
    },

    /// Batch, action or atom dimensions disagree with what was configured
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        expected: String,
        actual: String,
    },

    /// NaN or infinite values where finite numbers are required
    #[error("Numeric anomaly: {0}")]
    NumericAnomaly(String),

    /// Not enough transitions stored to satisfy a request
    #[error("Empty buffer: {0}")]
    EmptyBuffer(String),

    /// Action index outside of the action space
    #[error("Invalid action {action}: must be less than {num_actions}")]
    InvalidAction {
        action: usize,
        num_actions: usize,
    },

    /// Training could not proceed (missing forward pass, inconsistent network state)
    #[error("Training error: {0}")]
    Training(String),

    /// Failure reported by an environment implementation
    #[error("Environment error: {0}")]
    Environment(String),

    /// IO errors (checkpoints, config files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for C51Error {
    fn from(err: bincode::Error) -> Self {
        C51Error::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for C51Error {
    fn from(err: serde_json::Error) -> Self {
        C51Error::Serialization(err.to_string())
    }
}

// Helper functions for common error patterns
impl C51Error {
    pub fn configuration<S: Into<String>, R: Into<String>>(name: S, reason: R) -> Self {
        C51Error::Configuration {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn shape_mismatch<S: Into<String>, A: Into<String>>(expected: S, actual: A) -> Self {
        C51Error::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn numeric<S: Into<String>>(msg: S) -> Self {
        C51Error::NumericAnomaly(msg.into())
    }
}
