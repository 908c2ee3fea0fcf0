//! Application configuration.
//!
//! The configuration is a JSON document:
//!
//! ```json
//! {
//!   "subscriber": { "hostName": "mr.example.net", "topicName": "ves-events" },
//!   "publisher": { "hostName": "mr.example.net", "topicName": "tca-alerts" },
//!   "policyPath": "policy.json",
//!   "statusTable": { "path": "status.jsonl", "timeToLiveSecs": 2592000 },
//!   "workerCount": 4
//! }
//! ```
//!
//! Validation reports every problem at once rather than stopping at the first.
//!
//! When loaded with [`AppConfig::from_file`], a relative `policyPath` or
//! `statusTable.path` is resolved against the directory holding the
//! configuration file, not the process working directory.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CliError;
use crate::pool::MAX_WORKER_COUNT;

/// Default retention for status records: 30 days.
pub const DEFAULT_TIME_TO_LIVE_SECS: u64 = 30 * 24 * 60 * 60;

/// Default number of workers.
pub const DEFAULT_WORKER_COUNT: usize = 2;

/// A message router endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EndpointConfig {
    /// Host name of the message router.
    pub host_name: String,
    /// Topic to subscribe or publish to.
    pub topic_name: String,
}

/// Status table settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusTableConfig {
    /// Path of the JSON-lines status table.
    pub path: PathBuf,
    /// How long status records are kept.
    pub time_to_live_secs: u64,
}

impl Default for StatusTableConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("tca-status.jsonl"),
            time_to_live_secs: DEFAULT_TIME_TO_LIVE_SECS,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Where events are consumed from.
    pub subscriber: EndpointConfig,
    /// Where alerts are published to.
    pub publisher: EndpointConfig,
    /// Path of the policy document.
    pub policy_path: PathBuf,
    /// Status table settings.
    pub status_table: StatusTableConfig,
    /// Number of parallel workers.
    pub worker_count: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            subscriber: EndpointConfig::default(),
            publisher: EndpointConfig::default(),
            policy_path: PathBuf::from("policy.json"),
            status_table: StatusTableConfig::default(),
            worker_count: DEFAULT_WORKER_COUNT,
        }
    }
}

impl AppConfig {
    /// A filled-in configuration suitable as a starting point.
    #[must_use]
    pub fn sample() -> Self {
        Self {
            subscriber: EndpointConfig {
                host_name: "localhost".to_string(),
                topic_name: "unauthenticated.SEC_MEASUREMENT_OUTPUT".to_string(),
            },
            publisher: EndpointConfig {
                host_name: "localhost".to_string(),
                topic_name: "unauthenticated.TCA_EVENT_OUTPUT".to_string(),
            },
            ..Self::default()
        }
    }

    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if
    /// validation reports any problem.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CliError> {
        let path = path.as_ref();
        let mut config = Self::load(path)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate().into_result()?;
        Ok(config)
    }

    /// Rewrites relative file paths to be relative to `base`.
    ///
    /// Empty and absolute paths are left alone.
    pub fn resolve_paths(&mut self, base: &Path) {
        rebase(&mut self.policy_path, base);
        rebase(&mut self.status_table.path, base);
    }

    /// Loads a configuration file without validating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CliError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!(
                "failed to read config file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_json(&content)
    }

    /// Parses a configuration from JSON without validating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid.
    pub fn from_json(content: &str) -> Result<Self, CliError> {
        serde_json::from_str(content).map_err(|e| CliError::Config(format!("invalid JSON: {e}")))
    }

    /// Serializes the configuration as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, CliError> {
        serde_json::to_string_pretty(self).map_err(|e| CliError::Format(e.to_string()))
    }

    /// Checks every field and collects all problems.
    #[must_use]
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        report.require(
            "subscriberHostName",
            &self.subscriber.host_name,
            "Subscriber host name must be present",
        );
        report.require(
            "subscriberTopicName",
            &self.subscriber.topic_name,
            "Subscriber topic name must be present",
        );
        report.require(
            "publisherHostName",
            &self.publisher.host_name,
            "Publisher host name must be present",
        );
        report.require(
            "publisherTopicName",
            &self.publisher.topic_name,
            "Publisher topic name must be present",
        );

        if self.policy_path.as_os_str().is_empty() {
            report.push("policyPath", "Policy path must be present");
        }
        if self.status_table.path.as_os_str().is_empty() {
            report.push("statusTablePath", "Status table path must be present");
        }
        if self.status_table.time_to_live_secs == 0 {
            report.push(
                "statusTableTimeToLiveSecs",
                "Status table time to live must be positive",
            );
        }
        if self.worker_count == 0 {
            report.push("workerCount", "Worker count must be at least 1");
        } else if self.worker_count > MAX_WORKER_COUNT {
            report.push(
                "workerCount",
                &format!("Worker count must be at most {MAX_WORKER_COUNT}"),
            );
        }

        report
    }
}

fn rebase(path: &mut PathBuf, base: &Path) {
    if !path.as_os_str().is_empty() && path.is_relative() {
        *path = base.join(&*path);
    }
}

/// One configuration problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// The offending field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

/// Every problem found in a configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    errors: Vec<FieldError>,
}

impl ValidationReport {
    fn push(&mut self, field: &str, message: &str) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    fn require(&mut self, field: &str, value: &str, message: &str) {
        if value.trim().is_empty() {
            self.push(field, message);
        }
    }

    /// Returns `true` if no problem was found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the problems in check order.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Converts the report into a result.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::InvalidConfig`] carrying the report if it is not valid.
    pub fn into_result(self) -> Result<(), CliError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(CliError::InvalidConfig(self))
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
        write!(f, "{}", messages.join(", "))
    }
}
