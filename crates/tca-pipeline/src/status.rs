//! Status records and the status table shape.
//!
//! A [`StatusRecord`] is the flat audit row written once per event. Stage
//! columns for stages that never ran stay `null`; they are never filled with
//! a placeholder state.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::{MessageType, ProcessingContext, ProcessingState, StageName};
use crate::error::{PipelineError, Result};

/// Per-write metadata supplied by the persister.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMeta {
    /// Key the record is written under.
    pub row_key: String,
    /// Processing time in milliseconds since the epoch.
    pub timestamp_millis: i64,
    /// Worker instance that processed the event.
    pub instance_id: u32,
}

/// The flat audit record of one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    /// Storage key of this record.
    pub row_key: String,
    /// Processing time in milliseconds since the epoch.
    pub timestamp_millis: i64,
    /// Worker instance that processed the event.
    pub instance_id: u32,
    /// Outcome classification; also the row key prefix.
    pub message_type: MessageType,
    /// The event text as received.
    pub raw_event: String,
    /// Header domain, if the envelope parsed and carried one.
    pub domain: Option<String>,
    /// Header functional role, if present.
    pub functional_role: Option<String>,
    /// Header source id, if present.
    pub source_id: Option<String>,
    /// Field path of the violated threshold.
    pub threshold_field_path: Option<String>,
    /// Severity of the violated threshold.
    pub threshold_severity: Option<String>,
    /// Direction of the violated threshold.
    pub threshold_direction: Option<String>,
    /// Limit of the violated threshold.
    pub threshold_value: Option<f64>,
    /// Value that crossed the violated threshold.
    pub observed_value: Option<f64>,
    /// Envelope stage state.
    pub envelope_validation_status: Option<ProcessingState>,
    /// Envelope stage message.
    pub envelope_validation_message: Option<String>,
    /// Domain filter state.
    pub domain_filter_status: Option<ProcessingState>,
    /// Domain filter message.
    pub domain_filter_message: Option<String>,
    /// Functional role filter state.
    pub functional_role_filter_status: Option<ProcessingState>,
    /// Functional role filter message.
    pub functional_role_filter_message: Option<String>,
    /// Threshold evaluation state.
    pub threshold_evaluation_status: Option<ProcessingState>,
    /// Threshold evaluation message.
    pub threshold_evaluation_message: Option<String>,
    /// Alert text supplied by the caller, stored verbatim.
    pub alert_message: Option<String>,
}

impl StatusRecord {
    /// Builds the record for a completed, possibly partial, context.
    #[must_use]
    pub fn from_context(context: &ProcessingContext, meta: RecordMeta) -> Self {
        let mut record = Self::empty(meta, context.message_type(), context.raw_event());

        if let Some(envelope) = context.envelope() {
            let header = envelope.header();
            record.domain.clone_from(&header.domain);
            record.functional_role.clone_from(&header.functional_role);
            record.source_id.clone_from(&header.source_id);
        }

        if let Some(violation) = context.violation() {
            let threshold = &violation.threshold;
            record.threshold_field_path = Some(threshold.field_path.clone());
            record.threshold_severity = Some(threshold.severity.as_str().to_string());
            record.threshold_direction = Some(threshold.direction.as_str().to_string());
            record.threshold_value = Some(threshold.threshold_value);
            record.observed_value = Some(violation.observed_value);
        }

        for outcome in context.outcomes() {
            let (status, message) = match outcome.stage {
                StageName::EnvelopeValidation => (
                    &mut record.envelope_validation_status,
                    &mut record.envelope_validation_message,
                ),
                StageName::DomainFilter => (
                    &mut record.domain_filter_status,
                    &mut record.domain_filter_message,
                ),
                StageName::FunctionalRoleFilter => (
                    &mut record.functional_role_filter_status,
                    &mut record.functional_role_filter_message,
                ),
                StageName::ThresholdEvaluation => (
                    &mut record.threshold_evaluation_status,
                    &mut record.threshold_evaluation_message,
                ),
            };
            *status = Some(outcome.state);
            message.clone_from(&outcome.message);
        }

        record.alert_message = context.alert_message().map(str::to_string);
        record
    }

    fn empty(meta: RecordMeta, message_type: MessageType, raw_event: &str) -> Self {
        Self {
            row_key: meta.row_key,
            timestamp_millis: meta.timestamp_millis,
            instance_id: meta.instance_id,
            message_type,
            raw_event: raw_event.to_string(),
            domain: None,
            functional_role: None,
            source_id: None,
            threshold_field_path: None,
            threshold_severity: None,
            threshold_direction: None,
            threshold_value: None,
            observed_value: None,
            envelope_validation_status: None,
            envelope_validation_message: None,
            domain_filter_status: None,
            domain_filter_message: None,
            functional_role_filter_status: None,
            functional_role_filter_message: None,
            threshold_evaluation_status: None,
            threshold_evaluation_message: None,
            alert_message: None,
        }
    }

    /// Returns the recorded state of a stage, or `None` if it never ran.
    #[must_use]
    pub const fn stage_status(&self, stage: StageName) -> Option<ProcessingState> {
        match stage {
            StageName::EnvelopeValidation => self.envelope_validation_status,
            StageName::DomainFilter => self.domain_filter_status,
            StageName::FunctionalRoleFilter => self.functional_role_filter_status,
            StageName::ThresholdEvaluation => self.threshold_evaluation_status,
        }
    }

    /// Returns the recorded message of a stage.
    #[must_use]
    pub fn stage_message(&self, stage: StageName) -> Option<&str> {
        match stage {
            StageName::EnvelopeValidation => self.envelope_validation_message.as_deref(),
            StageName::DomainFilter => self.domain_filter_message.as_deref(),
            StageName::FunctionalRoleFilter => self.functional_role_filter_message.as_deref(),
            StageName::ThresholdEvaluation => self.threshold_evaluation_message.as_deref(),
        }
    }
}

/// Properties the status table is created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTableProperties {
    time_to_live: Duration,
    columns: Vec<String>,
}

impl StatusTableProperties {
    /// Derives the table properties from the status record shape.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the TTL is zero or the record
    /// does not serialize to a flat object.
    pub fn new(time_to_live_secs: u64) -> Result<Self> {
        if time_to_live_secs == 0 {
            return Err(PipelineError::Config {
                reason: "status table time to live must be positive".to_string(),
            });
        }

        let template = StatusRecord::empty(
            RecordMeta {
                row_key: String::new(),
                timestamp_millis: 0,
                instance_id: 0,
            },
            MessageType::Inapplicable,
            "",
        );
        let columns = flat_columns(&template)?;

        Ok(Self {
            time_to_live: Duration::from_secs(time_to_live_secs),
            columns,
        })
    }

    /// Returns how long status records are retained.
    #[must_use]
    pub const fn time_to_live(&self) -> Duration {
        self.time_to_live
    }

    /// Returns the column names, sorted.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

fn flat_columns<T: Serialize>(record: &T) -> Result<Vec<String>> {
    let value = serde_json::to_value(record).map_err(|e| PipelineError::Config {
        reason: format!("unable to convert status record to table schema: {e}"),
    })?;

    let Value::Object(fields) = value else {
        return Err(PipelineError::Config {
            reason: "status record does not serialize to an object".to_string(),
        });
    };

    fields
        .into_iter()
        .map(|(name, value)| match value {
            Value::Array(_) | Value::Object(_) => Err(PipelineError::Config {
                reason: format!("status record column '{name}' is not a scalar"),
            }),
            _ => Ok(name),
        })
        .collect::<Result<Vec<_>>>()
        .map(|mut columns| {
            columns.sort();
            columns
        })
}
