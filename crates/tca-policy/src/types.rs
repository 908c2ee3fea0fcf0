//! Core value types of a threshold crossing policy.
//!
//! - [`Direction`]: How an observed value is compared against a threshold
//! - [`Severity`]: The severity carried by a threshold
//! - [`Threshold`]: One immutable field-path comparison declared by the operator

use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, Result};

/// Comparison direction of a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Violated when the observed value is strictly greater than the threshold.
    GreaterThan,
    /// Violated when the observed value is strictly less than the threshold.
    LessThan,
    /// Violated when the observed value is exactly equal to the threshold.
    Equal,
}

impl Direction {
    /// Evaluates `observed <direction> threshold`.
    ///
    /// `Equal` is exact equality with no tolerance.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn evaluate(&self, observed: f64, threshold: f64) -> bool {
        match self {
            Self::GreaterThan => observed > threshold,
            Self::LessThan => observed < threshold,
            Self::Equal => observed == threshold,
        }
    }

    /// Returns the wire name of the direction.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::GreaterThan => "GREATER_THAN",
            Self::LessThan => "LESS_THAN",
            Self::Equal => "EQUAL",
        }
    }

    /// Returns the operator symbol of the direction.
    #[must_use]
    pub const fn as_symbol(&self) -> &'static str {
        match self {
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::Equal => "==",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity declared on a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Service affecting, requires immediate action.
    Critical,
    /// Significant degradation.
    Major,
    /// Minor degradation.
    Minor,
    /// Potential problem, no degradation yet.
    Warning,
}

impl Severity {
    /// Returns the wire name of the severity.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::Major => "MAJOR",
            Self::Minor => "MINOR",
            Self::Warning => "WARNING",
        }
    }

    /// Returns the priority of this severity (higher = more urgent).
    ///
    /// Informational only: threshold selection is first-match in declared
    /// order and never consults this value.
    #[must_use]
    pub const fn priority(&self) -> u8 {
        match self {
            Self::Warning => 1,
            Self::Minor => 2,
            Self::Major => 3,
            Self::Critical => 4,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single threshold declared by the operator for a functional role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Threshold {
    /// Path of the event field the threshold applies to.
    pub field_path: String,
    /// Comparison direction.
    pub direction: Direction,
    /// Severity reported when the threshold is crossed.
    pub severity: Severity,
    /// The limit the observed value is compared against.
    pub threshold_value: f64,
    /// Name of the control loop this threshold feeds, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_loop_name: Option<String>,
}

impl Threshold {
    /// Maximum allowed length for a field path.
    pub const MAX_FIELD_PATH_LENGTH: usize = 512;

    /// Creates a new threshold.
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::InvalidThreshold` if the field path is empty or
    /// too long, or if the threshold value is not finite.
    pub fn new(
        field_path: impl Into<String>,
        direction: Direction,
        severity: Severity,
        threshold_value: f64,
    ) -> Result<Self> {
        let threshold = Self {
            field_path: field_path.into(),
            direction,
            severity,
            threshold_value,
            control_loop_name: None,
        };
        threshold.validate()?;
        Ok(threshold)
    }

    /// Sets the control loop name.
    #[must_use]
    pub fn with_control_loop_name(mut self, name: impl Into<String>) -> Self {
        self.control_loop_name = Some(name.into());
        self
    }

    /// Checks the invariants of a threshold, including deserialized ones.
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::InvalidThreshold` describing the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.field_path.trim().is_empty() {
            return Err(PolicyError::InvalidThreshold {
                reason: "field path cannot be empty".to_string(),
            });
        }

        if self.field_path.len() > Self::MAX_FIELD_PATH_LENGTH {
            return Err(PolicyError::InvalidThreshold {
                reason: format!(
                    "field path exceeds maximum length of {} characters",
                    Self::MAX_FIELD_PATH_LENGTH
                ),
            });
        }

        if !self.threshold_value.is_finite() {
            return Err(PolicyError::InvalidThreshold {
                reason: format!(
                    "threshold value for '{}' must be a finite number",
                    self.field_path
                ),
            });
        }

        Ok(())
    }

    /// Returns true if `observed` crosses this threshold.
    #[must_use]
    pub fn is_violated_by(&self, observed: f64) -> bool {
        self.direction.evaluate(observed, self.threshold_value)
    }
}

impl std::fmt::Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} ({})",
            self.field_path,
            self.direction.as_symbol(),
            self.threshold_value,
            self.severity
        )
    }
}
