//! Alert text for non-compliant events.
//!
//! The alert is composed here and stored in the status record. Publishing it
//! to the publisher topic happens elsewhere.

use serde::Serialize;
use tca_pipeline::{MessageType, ProcessingContext};

/// The alert raised for a threshold violation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdAlert {
    /// Control loop the violated threshold feeds, if configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_loop_control_name: Option<String>,
    /// Event start time in microseconds, if the header carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_loop_alarm_start: Option<i64>,
    /// Functional role of the emitting network function.
    pub functional_role: String,
    /// Event domain.
    pub domain: String,
    /// Event source, if the header carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    /// Field path of the violated threshold.
    pub field_path: String,
    /// Threshold severity.
    pub severity: String,
    /// Threshold direction.
    pub direction: String,
    /// Threshold limit.
    pub threshold_value: f64,
    /// The value that crossed the limit.
    pub observed_value: f64,
}

impl ThresholdAlert {
    /// Builds the alert for a non-compliant context.
    ///
    /// Returns `None` for any other outcome.
    #[must_use]
    pub fn from_context(context: &ProcessingContext) -> Option<Self> {
        if context.message_type() != MessageType::NonCompliant {
            return None;
        }
        let violation = context.violation()?;
        let header = context.envelope()?.header();
        let threshold = &violation.threshold;

        Some(Self {
            closed_loop_control_name: threshold.control_loop_name.clone(),
            closed_loop_alarm_start: header.start_epoch_microsec,
            functional_role: header.functional_role.clone().unwrap_or_default(),
            domain: header.domain.clone().unwrap_or_default(),
            source_id: header.source_id.clone(),
            field_path: threshold.field_path.clone(),
            severity: threshold.severity.as_str().to_string(),
            direction: threshold.direction.as_str().to_string(),
            threshold_value: threshold.threshold_value,
            observed_value: violation.observed_value,
        })
    }

    /// Renders the alert as compact JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.summary())
    }

    /// One-line human summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} {} on {}: {} {} {} (observed {})",
            self.severity,
            self.functional_role,
            self.domain,
            self.field_path,
            self.direction,
            self.threshold_value,
            self.observed_value
        )
    }
}

/// Attaches alert text to a context when it is non-compliant.
#[must_use]
pub fn attach_alert(context: ProcessingContext) -> ProcessingContext {
    match ThresholdAlert::from_context(&context) {
        Some(alert) => {
            let text = alert.to_json();
            context.with_alert_message(text)
        }
        None => context,
    }
}
