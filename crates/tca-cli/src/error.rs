//! CLI error types.

use tca_pipeline::{PipelineError, SinkError};
use tca_policy::PolicyError;
use thiserror::Error;

use crate::config::ValidationReport;

/// Errors reported by `tca` commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The configuration was read but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(ValidationReport),

    /// The policy document is unusable.
    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    /// The pipeline failed (persistence or start-up configuration).
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The status table could not be opened or read.
    #[error("status table error: {0}")]
    Sink(#[from] SinkError),

    /// A worker task failed.
    #[error("worker error: {0}")]
    Worker(String),

    /// Output formatting failed.
    #[error("format error: {0}")]
    Format(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = CliError::Config("bad".into());
        assert_eq!(err.to_string(), "configuration error: bad");
    }

    #[test]
    fn pipeline_error_is_transparent() {
        let err = CliError::from(PipelineError::Config {
            reason: "zero ttl".into(),
        });
        assert_eq!(err.to_string(), "configuration error: zero ttl");
    }

    #[test]
    fn from_io_error() {
        let err = CliError::from(std::io::Error::other("boom"));
        assert!(matches!(err, CliError::Io(_)));
    }
}
