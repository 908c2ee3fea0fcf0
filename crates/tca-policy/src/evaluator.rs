//! First-match threshold evaluation.
//!
//! Thresholds are evaluated in the order the policy declares them. The first
//! threshold whose field path has an observed value and whose comparison
//! holds is the violation; later thresholds are never looked at. A threshold
//! whose field path has no observed value is skipped.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::Threshold;

/// The thresholds of one functional role together with the values observed
/// for their field paths in a single event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsPerFunctionalRole {
    /// The functional role the thresholds belong to.
    pub functional_role: String,
    /// Thresholds in policy-declared order.
    pub thresholds: Vec<Threshold>,
    /// Observed value per field path. Paths that could not be resolved are absent.
    pub observed_values: HashMap<String, f64>,
}

impl MetricsPerFunctionalRole {
    /// Creates an instance from already resolved values.
    #[must_use]
    pub fn new(
        functional_role: impl Into<String>,
        thresholds: Vec<Threshold>,
        observed_values: HashMap<String, f64>,
    ) -> Self {
        Self {
            functional_role: functional_role.into(),
            thresholds,
            observed_values,
        }
    }

    /// Resolves the observed value of every threshold field path with `resolve`.
    ///
    /// Each distinct field path is resolved once.
    pub fn resolve<F>(functional_role: impl Into<String>, thresholds: &[Threshold], mut resolve: F) -> Self
    where
        F: FnMut(&str) -> Option<f64>,
    {
        let mut observed_values = HashMap::new();
        for threshold in thresholds {
            if observed_values.contains_key(&threshold.field_path) {
                continue;
            }
            if let Some(value) = resolve(&threshold.field_path) {
                observed_values.insert(threshold.field_path.clone(), value);
            }
        }

        Self {
            functional_role: functional_role.into(),
            thresholds: thresholds.to_vec(),
            observed_values,
        }
    }

    /// Returns the observed value for a field path.
    #[must_use]
    pub fn observed(&self, field_path: &str) -> Option<f64> {
        self.observed_values.get(field_path).copied()
    }
}

/// A threshold that was crossed and the value that crossed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdViolation {
    /// The violated threshold.
    pub threshold: Threshold,
    /// The observed value of the threshold field path.
    pub observed_value: f64,
}

impl std::fmt::Display for ThresholdViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (observed {})", self.threshold, self.observed_value)
    }
}

/// Returns the first violated threshold in declared order, if any.
#[must_use]
pub fn first_violated_threshold(metrics: &MetricsPerFunctionalRole) -> Option<ThresholdViolation> {
    metrics.thresholds.iter().find_map(|threshold| {
        let observed = metrics.observed(&threshold.field_path)?;
        threshold
            .is_violated_by(observed)
            .then(|| ThresholdViolation {
                threshold: threshold.clone(),
                observed_value: observed,
            })
    })
}
