//! Error types for the tca-pipeline crate.
//!
//! Malformed events never surface as [`PipelineError`]: the envelope stage
//! renders an [`EnvelopeError`] into its ERROR outcome instead. Only
//! persistence and start-up configuration failures escape the pipeline.

use thiserror::Error;

/// Reasons an inbound event cannot be turned into an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// The raw event text was empty or whitespace.
    #[error("received event text is empty")]
    Empty,

    /// The raw event text is not valid JSON.
    #[error("event is not valid JSON: {0}")]
    InvalidJson(String),

    /// The JSON document has no `event` object.
    #[error("event object not present")]
    MissingEvent,

    /// The `event` object has no `commonEventHeader` object.
    #[error("common event header not present")]
    MissingCommonEventHeader,
}

/// Errors reported by a status sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The record could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The sink refused the write.
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Errors that escape the pipeline boundary.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Writing the status record failed. The record for this attempt is lost.
    #[error("failed to persist status record '{row_key}': {source}")]
    Persistence {
        /// Row key the record was written under.
        row_key: String,
        /// The sink failure.
        #[source]
        source: SinkError,
    },

    /// Start-up configuration is unusable.
    #[error("configuration error: {reason}")]
    Config {
        /// The reason the configuration is unusable.
        reason: String,
    },
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
