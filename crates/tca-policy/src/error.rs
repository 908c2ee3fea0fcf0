//! Error types for the tca-policy crate.

use thiserror::Error;

/// Errors raised while building or loading a threshold crossing policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The policy document is structurally valid JSON but not a usable policy.
    #[error("invalid policy: {reason}")]
    InvalidPolicy {
        /// The reason the policy is invalid.
        reason: String,
    },

    /// A threshold inside the policy is not usable.
    #[error("invalid threshold: {reason}")]
    InvalidThreshold {
        /// The reason the threshold is invalid.
        reason: String,
    },

    /// The policy document could not be read.
    #[error("failed to read policy '{path}': {source}")]
    Io {
        /// Path of the policy document.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for PolicyError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Result type for policy operations.
pub type Result<T> = std::result::Result<T, PolicyError>;
