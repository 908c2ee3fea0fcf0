//! The per-event processing context and stage outcome types.
//!
//! A [`ProcessingContext`] is created for exactly one event, threaded through
//! the stage chain by value and dropped once the status record is built. It
//! is never shared between events. Stages do not mutate it: they read it and
//! return a [`StageOutput`], and the chain folds that output into the next
//! context value with [`ProcessingContext::apply`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tca_policy::{MetricsPerFunctionalRole, Policy, Threshold, ThresholdViolation};

use crate::envelope::EventEnvelope;

/// Identifies a pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageName {
    /// Envelope parse and validation.
    EnvelopeValidation,
    /// Policy domain filter.
    DomainFilter,
    /// Policy functional role filter.
    FunctionalRoleFilter,
    /// Threshold evaluation.
    ThresholdEvaluation,
}

impl StageName {
    /// All stages in execution order.
    pub const ALL: [Self; 4] = [
        Self::EnvelopeValidation,
        Self::DomainFilter,
        Self::FunctionalRoleFilter,
        Self::ThresholdEvaluation,
    ];

    /// Returns the stage name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EnvelopeValidation => "ENVELOPE_VALIDATION",
            Self::DomainFilter => "DOMAIN_FILTER",
            Self::FunctionalRoleFilter => "FUNCTIONAL_ROLE_FILTER",
            Self::ThresholdEvaluation => "THRESHOLD_EVALUATION",
        }
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result state of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingState {
    /// The stage passed and the chain continues.
    Finished,
    /// The event is out of policy scope; the chain stops without error.
    Terminated,
    /// The event could not be evaluated; the chain stops.
    Error,
}

impl ProcessingState {
    /// Returns the state as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Finished => "FINISHED",
            Self::Terminated => "TERMINATED",
            Self::Error => "ERROR",
        }
    }

    /// Returns the chain signal implied by this state.
    #[must_use]
    pub const fn signal(&self) -> StageSignal {
        match self {
            Self::Finished => StageSignal::Continue,
            Self::Terminated | Self::Error => StageSignal::Stop,
        }
    }
}

impl std::fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether the chain should run the next stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageSignal {
    /// Run the next stage.
    Continue,
    /// Skip all remaining stages.
    Stop,
}

/// The outcome one stage recorded for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingOutcome {
    /// The stage that produced this outcome.
    pub stage: StageName,
    /// The result state.
    pub state: ProcessingState,
    /// Human readable diagnostics.
    pub message: Option<String>,
}

impl ProcessingOutcome {
    /// Creates a FINISHED outcome.
    #[must_use]
    pub fn finished(stage: StageName, message: impl Into<String>) -> Self {
        Self {
            stage,
            state: ProcessingState::Finished,
            message: Some(message.into()),
        }
    }

    /// Creates a TERMINATED outcome.
    #[must_use]
    pub fn terminated(stage: StageName, message: impl Into<String>) -> Self {
        Self {
            stage,
            state: ProcessingState::Terminated,
            message: Some(message.into()),
        }
    }

    /// Creates an ERROR outcome.
    #[must_use]
    pub fn error(stage: StageName, message: impl Into<String>) -> Self {
        Self {
            stage,
            state: ProcessingState::Error,
            message: Some(message.into()),
        }
    }
}

/// Data a stage produced in addition to its outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum StageArtifact {
    /// The parsed envelope.
    Envelope(EventEnvelope),
    /// Resolved thresholds and observed values, plus the violation if any.
    Evaluation {
        /// Thresholds and observed values for the event's functional role.
        metrics: MetricsPerFunctionalRole,
        /// The first violated threshold.
        violation: Option<ThresholdViolation>,
    },
}

/// What a stage returns to the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutput {
    /// The stage outcome.
    pub outcome: ProcessingOutcome,
    /// Data to fold into the context.
    pub artifact: Option<StageArtifact>,
}

impl StageOutput {
    /// An output carrying only an outcome.
    #[must_use]
    pub const fn outcome(outcome: ProcessingOutcome) -> Self {
        Self {
            outcome,
            artifact: None,
        }
    }

    /// Attaches an artifact.
    #[must_use]
    pub fn with_artifact(mut self, artifact: StageArtifact) -> Self {
        self.artifact = Some(artifact);
        self
    }
}

/// Status tag of a completed event, used as the row key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// The chain stopped before evaluating thresholds.
    Inapplicable,
    /// All stages finished and no threshold was violated.
    Compliant,
    /// A threshold was violated.
    NonCompliant,
}

impl MessageType {
    /// Returns the message type as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inapplicable => "INAPPLICABLE",
            Self::Compliant => "COMPLIANT",
            Self::NonCompliant => "NON_COMPLIANT",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-event state threaded through the stage chain.
#[derive(Debug, Clone)]
pub struct ProcessingContext {
    raw_event: String,
    envelope: Option<EventEnvelope>,
    policy: Arc<Policy>,
    metrics: Option<MetricsPerFunctionalRole>,
    violation: Option<ThresholdViolation>,
    outcomes: Vec<ProcessingOutcome>,
    alert_message: Option<String>,
}

impl ProcessingContext {
    /// Creates a fresh context for one event.
    #[must_use]
    pub fn new(raw_event: impl Into<String>, policy: Arc<Policy>) -> Self {
        Self {
            raw_event: raw_event.into(),
            envelope: None,
            policy,
            metrics: None,
            violation: None,
            outcomes: Vec::with_capacity(StageName::ALL.len()),
            alert_message: None,
        }
    }

    /// Folds a stage output into the context and returns the chain signal.
    #[must_use]
    pub fn apply(mut self, output: StageOutput) -> (Self, StageSignal) {
        match output.artifact {
            Some(StageArtifact::Envelope(envelope)) => self.envelope = Some(envelope),
            Some(StageArtifact::Evaluation { metrics, violation }) => {
                self.metrics = Some(metrics);
                self.violation = violation;
            }
            None => {}
        }

        let signal = output.outcome.state.signal();
        self.outcomes.push(output.outcome);
        (self, signal)
    }

    /// Attaches alert text. The text is stored verbatim.
    #[must_use]
    pub fn with_alert_message(mut self, alert_message: impl Into<String>) -> Self {
        self.alert_message = Some(alert_message.into());
        self
    }

    /// Returns the raw event text.
    #[must_use]
    pub fn raw_event(&self) -> &str {
        &self.raw_event
    }

    /// Returns the parsed envelope, once the envelope stage has finished.
    #[must_use]
    pub const fn envelope(&self) -> Option<&EventEnvelope> {
        self.envelope.as_ref()
    }

    /// Returns the policy this event is evaluated against.
    #[must_use]
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Returns the resolved thresholds and observed values.
    #[must_use]
    pub const fn metrics(&self) -> Option<&MetricsPerFunctionalRole> {
        self.metrics.as_ref()
    }

    /// Returns the threshold violation, if one was found.
    #[must_use]
    pub const fn violation(&self) -> Option<&ThresholdViolation> {
        self.violation.as_ref()
    }

    /// Returns the violated threshold, if one was found.
    #[must_use]
    pub fn violated_threshold(&self) -> Option<&Threshold> {
        self.violation.as_ref().map(|v| &v.threshold)
    }

    /// Returns the recorded outcomes in stage order.
    #[must_use]
    pub fn outcomes(&self) -> &[ProcessingOutcome] {
        &self.outcomes
    }

    /// Returns the outcome recorded by a stage, if it ran.
    #[must_use]
    pub fn outcome(&self, stage: StageName) -> Option<&ProcessingOutcome> {
        self.outcomes.iter().find(|o| o.stage == stage)
    }

    /// Returns the alert text, if any.
    #[must_use]
    pub fn alert_message(&self) -> Option<&str> {
        self.alert_message.as_deref()
    }

    /// Classifies the event for the row key.
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        let all_finished = !self.outcomes.is_empty()
            && self
                .outcomes
                .iter()
                .all(|o| o.state == ProcessingState::Finished);

        if !all_finished || self.outcome(StageName::ThresholdEvaluation).is_none() {
            MessageType::Inapplicable
        } else if self.violation.is_some() {
            MessageType::NonCompliant
        } else {
            MessageType::Compliant
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tca_policy::{Direction, Severity};

    fn policy() -> Arc<Policy> {
        let threshold =
            Threshold::new("cpu", Direction::GreaterThan, Severity::Critical, 80.0).unwrap();
        Arc::new(
            Policy::builder()
                .domain("fault")
                .threshold("vFW", threshold)
                .build()
                .unwrap(),
        )
    }

    fn finished(stage: StageName) -> StageOutput {
        StageOutput::outcome(ProcessingOutcome::finished(stage, "ok"))
    }

    mod enum_tests {
        use super::*;

        #[test]
        fn stage_order() {
            assert_eq!(StageName::ALL[0], StageName::EnvelopeValidation);
            assert_eq!(StageName::ALL[3], StageName::ThresholdEvaluation);
            assert!(StageName::DomainFilter < StageName::FunctionalRoleFilter);
        }

        #[test]
        fn stage_display() {
            assert_eq!(StageName::DomainFilter.to_string(), "DOMAIN_FILTER");
        }

        #[test]
        fn state_signal() {
            assert_eq!(ProcessingState::Finished.signal(), StageSignal::Continue);
            assert_eq!(ProcessingState::Terminated.signal(), StageSignal::Stop);
            assert_eq!(ProcessingState::Error.signal(), StageSignal::Stop);
        }

        #[test]
        fn state_wire_format() {
            let json = serde_json::to_string(&ProcessingState::Terminated).unwrap();
            assert_eq!(json, "\"TERMINATED\"");
        }

        #[test]
        fn message_type_as_str() {
            assert_eq!(MessageType::Inapplicable.as_str(), "INAPPLICABLE");
            assert_eq!(MessageType::Compliant.as_str(), "COMPLIANT");
            assert_eq!(MessageType::NonCompliant.as_str(), "NON_COMPLIANT");
        }
    }

    mod context_tests {
        use super::*;

        #[test]
        fn new_context_is_empty() {
            let ctx = ProcessingContext::new("{}", policy());
            assert_eq!(ctx.raw_event(), "{}");
            assert!(ctx.envelope().is_none());
            assert!(ctx.metrics().is_none());
            assert!(ctx.violation().is_none());
            assert!(ctx.outcomes().is_empty());
            assert!(ctx.alert_message().is_none());
        }

        #[test]
        fn apply_appends_outcome_and_signals() {
            let ctx = ProcessingContext::new("{}", policy());
            let (ctx, signal) = ctx.apply(finished(StageName::EnvelopeValidation));
            assert_eq!(signal, StageSignal::Continue);

            let (ctx, signal) = ctx.apply(StageOutput::outcome(ProcessingOutcome::terminated(
                StageName::DomainFilter,
                "out of scope",
            )));
            assert_eq!(signal, StageSignal::Stop);
            assert_eq!(ctx.outcomes().len(), 2);
            assert_eq!(
                ctx.outcome(StageName::DomainFilter).map(|o| o.state),
                Some(ProcessingState::Terminated)
            );
            assert!(ctx.outcome(StageName::ThresholdEvaluation).is_none());
        }

        #[test]
        fn apply_stores_envelope_artifact() {
            let raw = r#"{"event": {"commonEventHeader": {"domain": "fault"}}}"#;
            let envelope = EventEnvelope::parse(raw).unwrap();
            let ctx = ProcessingContext::new(raw, policy());
            let (ctx, _) = ctx.apply(
                finished(StageName::EnvelopeValidation)
                    .with_artifact(StageArtifact::Envelope(envelope)),
            );
            assert_eq!(ctx.envelope().and_then(EventEnvelope::domain), Some("fault"));
        }

        #[test]
        fn alert_message_is_verbatim() {
            let ctx = ProcessingContext::new("{}", policy())
                .with_alert_message("{\"closedLoopControlName\":\"CL-1\"}");
            assert_eq!(
                ctx.alert_message(),
                Some("{\"closedLoopControlName\":\"CL-1\"}")
            );
        }
    }

    mod message_type_tests {
        use super::*;

        fn evaluated(violation: bool) -> ProcessingContext {
            let policy = policy();
            let thresholds = policy.thresholds_for("vFW").unwrap().to_vec();
            let metrics = MetricsPerFunctionalRole::resolve("vFW", &thresholds, |_| Some(90.0));
            let violation = violation.then(|| ThresholdViolation {
                threshold: thresholds[0].clone(),
                observed_value: 90.0,
            });

            let mut ctx = ProcessingContext::new("{}", policy);
            for stage in &StageName::ALL[..3] {
                ctx = ctx.apply(finished(*stage)).0;
            }
            ctx.apply(
                finished(StageName::ThresholdEvaluation)
                    .with_artifact(StageArtifact::Evaluation { metrics, violation }),
            )
            .0
        }

        #[test]
        fn empty_context_is_inapplicable() {
            let ctx = ProcessingContext::new("{}", policy());
            assert_eq!(ctx.message_type(), MessageType::Inapplicable);
        }

        #[test]
        fn stopped_context_is_inapplicable() {
            let ctx = ProcessingContext::new("{}", policy())
                .apply(StageOutput::outcome(ProcessingOutcome::error(
                    StageName::EnvelopeValidation,
                    "bad",
                )))
                .0;
            assert_eq!(ctx.message_type(), MessageType::Inapplicable);
        }

        #[test]
        fn violation_is_non_compliant() {
            let ctx = evaluated(true);
            assert_eq!(ctx.message_type(), MessageType::NonCompliant);
            assert_eq!(ctx.violated_threshold().map(|t| t.field_path.as_str()), Some("cpu"));
        }

        #[test]
        fn no_violation_is_compliant() {
            assert_eq!(evaluated(false).message_type(), MessageType::Compliant);
        }
    }
}
