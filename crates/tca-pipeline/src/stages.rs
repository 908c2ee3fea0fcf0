//! The four pipeline stages.
//!
//! Every stage reads the context, never mutates it, and returns exactly one
//! outcome for its own [`StageName`]. Policy-driven rejections are
//! TERMINATED outcomes; ERROR is reserved for input the stage cannot
//! evaluate at all.

use std::fmt;

use tca_policy::{first_violated_threshold, MetricsPerFunctionalRole};

use crate::context::{ProcessingContext, ProcessingOutcome, StageArtifact, StageName, StageOutput};
use crate::envelope::EventEnvelope;

/// A single step of the processing chain.
pub trait Stage: Send + Sync + fmt::Debug {
    /// Returns the name of this stage.
    fn name(&self) -> StageName;

    /// Returns a short description of what this stage does.
    fn description(&self) -> &'static str;

    /// Evaluates the stage against the context.
    fn process(&self, context: &ProcessingContext) -> StageOutput;
}

/// Parses the raw event text into an [`EventEnvelope`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeValidator;

impl Stage for EnvelopeValidator {
    fn name(&self) -> StageName {
        StageName::EnvelopeValidation
    }

    fn description(&self) -> &'static str {
        "Parses and validates the CEF event envelope"
    }

    fn process(&self, context: &ProcessingContext) -> StageOutput {
        match EventEnvelope::parse(context.raw_event()) {
            Ok(envelope) => StageOutput::outcome(ProcessingOutcome::finished(
                self.name(),
                "Event envelope parsed successfully",
            ))
            .with_artifact(StageArtifact::Envelope(envelope)),
            Err(e) => StageOutput::outcome(ProcessingOutcome::error(
                self.name(),
                format!("Invalid CEF message. {e}"),
            )),
        }
    }
}

/// Filters out events whose domain is not in the policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainFilter;

impl Stage for DomainFilter {
    fn name(&self) -> StageName {
        StageName::DomainFilter
    }

    fn description(&self) -> &'static str {
        "Filters out CEF messages which do not match policy domains"
    }

    fn process(&self, context: &ProcessingContext) -> StageOutput {
        let Some(envelope) = context.envelope() else {
            return missing_envelope(self.name());
        };

        let Some(domain) = envelope.domain() else {
            return StageOutput::outcome(ProcessingOutcome::error(
                self.name(),
                "Invalid CEF message. Common event header domain not present.",
            ));
        };

        let policy = context.policy();
        let allowed = policy.domains_display();

        let outcome = if policy.contains_domain(domain) {
            ProcessingOutcome::finished(
                self.name(),
                format!(
                    "Policy domain and event domain match successful. \
                     Event domain: {domain}, Policy domains: {allowed}"
                ),
            )
        } else {
            ProcessingOutcome::terminated(
                self.name(),
                format!(
                    "Policy domain and event domain match unsuccessful. \
                     Event domain: {domain}, Policy domains: {allowed}"
                ),
            )
        };
        StageOutput::outcome(outcome)
    }
}

/// Filters out events whose functional role is not in the policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionalRoleFilter;

impl Stage for FunctionalRoleFilter {
    fn name(&self) -> StageName {
        StageName::FunctionalRoleFilter
    }

    fn description(&self) -> &'static str {
        "Filters out CEF messages which do not match policy functional roles"
    }

    fn process(&self, context: &ProcessingContext) -> StageOutput {
        let Some(envelope) = context.envelope() else {
            return missing_envelope(self.name());
        };

        let Some(role) = envelope.functional_role() else {
            return StageOutput::outcome(ProcessingOutcome::error(
                self.name(),
                "Invalid CEF message. Common event header functional role not present.",
            ));
        };

        let policy = context.policy();
        let allowed = policy.functional_roles_display();

        let outcome = if policy.contains_functional_role(role) {
            ProcessingOutcome::finished(
                self.name(),
                format!(
                    "Policy functional roles and event functional role match successful. \
                     Event functional role: {role}, Policy functional roles: {allowed}"
                ),
            )
        } else {
            ProcessingOutcome::terminated(
                self.name(),
                format!(
                    "Policy functional roles and event functional role match unsuccessful. \
                     Event functional role: {role}, Policy functional roles: {allowed}"
                ),
            )
        };
        StageOutput::outcome(outcome)
    }
}

/// Resolves the role's thresholds against the event and finds the first violation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdEvaluator;

impl Stage for ThresholdEvaluator {
    fn name(&self) -> StageName {
        StageName::ThresholdEvaluation
    }

    fn description(&self) -> &'static str {
        "Evaluates policy thresholds against CEF message metrics"
    }

    fn process(&self, context: &ProcessingContext) -> StageOutput {
        let Some(envelope) = context.envelope() else {
            return missing_envelope(self.name());
        };

        let Some(role) = envelope.functional_role() else {
            return StageOutput::outcome(ProcessingOutcome::error(
                self.name(),
                "Invalid CEF message. Common event header functional role not present.",
            ));
        };

        let Some(thresholds) = context.policy().thresholds_for(role) else {
            return StageOutput::outcome(ProcessingOutcome::error(
                self.name(),
                format!("No policy thresholds found for functional role: {role}"),
            ));
        };

        let metrics =
            MetricsPerFunctionalRole::resolve(role, thresholds, |path| envelope.resolve_number(path));
        let violation = first_violated_threshold(&metrics);

        let message = match &violation {
            Some(v) => format!(
                "Threshold violation found. Functional role: {role}, Threshold: {}, Observed value: {}",
                v.threshold, v.observed_value
            ),
            None => format!(
                "No threshold violation found. Functional role: {role}, \
                 Thresholds: {}, Evaluable field paths: {}",
                metrics.thresholds.len(),
                metrics.observed_values.len()
            ),
        };

        StageOutput::outcome(ProcessingOutcome::finished(self.name(), message))
            .with_artifact(StageArtifact::Evaluation { metrics, violation })
    }
}

fn missing_envelope(stage: StageName) -> StageOutput {
    StageOutput::outcome(ProcessingOutcome::error(
        stage,
        "Event envelope not available. Envelope validation must run first.",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ProcessingState;
    use std::sync::Arc;
    use tca_policy::{Direction, Policy, Severity, Threshold};

    fn policy() -> Arc<Policy> {
        Arc::new(
            Policy::builder()
                .domain("fault")
                .domain("measurementsForVfScaling")
                .threshold(
                    "vFW",
                    Threshold::new("cpu", Direction::GreaterThan, Severity::Critical, 80.0)
                        .unwrap(),
                )
                .threshold(
                    "vFW",
                    Threshold::new("memory", Direction::LessThan, Severity::Major, 10.0).unwrap(),
                )
                .build()
                .unwrap(),
        )
    }

    fn event(header: &str, body: &str) -> String {
        format!(r#"{{"event": {{"commonEventHeader": {header}{body}}}}}"#)
    }

    /// Runs the envelope stage and folds it in.
    fn parsed(raw: &str) -> ProcessingContext {
        let ctx = ProcessingContext::new(raw, policy());
        let output = EnvelopeValidator.process(&ctx);
        ctx.apply(output).0
    }

    mod envelope_tests {
        use super::*;

        #[test]
        fn valid_envelope_finishes() {
            let raw = event(r#"{"domain": "fault"}"#, "");
            let ctx = ProcessingContext::new(raw, policy());
            let output = EnvelopeValidator.process(&ctx);

            assert_eq!(output.outcome.stage, StageName::EnvelopeValidation);
            assert_eq!(output.outcome.state, ProcessingState::Finished);
            assert!(matches!(output.artifact, Some(StageArtifact::Envelope(_))));
        }

        #[test]
        fn malformed_json_is_error() {
            let ctx = ProcessingContext::new("{oops", policy());
            let output = EnvelopeValidator.process(&ctx);

            assert_eq!(output.outcome.state, ProcessingState::Error);
            assert!(output.artifact.is_none());
            assert!(output
                .outcome
                .message
                .as_deref()
                .is_some_and(|m| m.contains("not valid JSON")));
        }

        #[test]
        fn missing_header_is_error() {
            let ctx = ProcessingContext::new(r#"{"event": {}}"#, policy());
            let output = EnvelopeValidator.process(&ctx);
            assert_eq!(output.outcome.state, ProcessingState::Error);
        }

        #[test]
        fn description_is_set() {
            assert!(!EnvelopeValidator.description().is_empty());
        }
    }

    mod domain_tests {
        use super::*;

        #[test]
        fn matching_domain_finishes() {
            let ctx = parsed(&event(r#"{"domain": "fault"}"#, ""));
            let output = DomainFilter.process(&ctx);
            assert_eq!(output.outcome.state, ProcessingState::Finished);
        }

        #[test]
        fn other_domain_terminates_naming_both() {
            let ctx = parsed(&event(r#"{"domain": "heartbeat"}"#, ""));
            let output = DomainFilter.process(&ctx);

            assert_eq!(output.outcome.state, ProcessingState::Terminated);
            let message = output.outcome.message.unwrap();
            assert!(message.contains("heartbeat"));
            assert!(message.contains("fault,measurementsForVfScaling"));
        }

        #[test]
        fn missing_domain_is_error() {
            let ctx = parsed(&event(r#"{"functionalRole": "vFW"}"#, ""));
            let output = DomainFilter.process(&ctx);
            assert_eq!(output.outcome.state, ProcessingState::Error);
        }

        #[test]
        fn missing_envelope_is_error() {
            let ctx = ProcessingContext::new("{}", policy());
            let output = DomainFilter.process(&ctx);
            assert_eq!(output.outcome.state, ProcessingState::Error);
            assert_eq!(output.outcome.stage, StageName::DomainFilter);
        }
    }

    mod functional_role_tests {
        use super::*;

        #[test]
        fn matching_role_finishes() {
            let ctx = parsed(&event(r#"{"domain": "fault", "functionalRole": "vFW"}"#, ""));
            let output = FunctionalRoleFilter.process(&ctx);
            assert_eq!(output.outcome.state, ProcessingState::Finished);
        }

        #[test]
        fn other_role_terminates() {
            let ctx = parsed(&event(r#"{"domain": "fault", "functionalRole": "vDNS"}"#, ""));
            let output = FunctionalRoleFilter.process(&ctx);

            assert_eq!(output.outcome.state, ProcessingState::Terminated);
            let message = output.outcome.message.unwrap();
            assert!(message.contains("vDNS"));
            assert!(message.contains("vFW"));
        }

        #[test]
        fn missing_role_is_error() {
            let ctx = parsed(&event(r#"{"domain": "fault"}"#, ""));
            let output = FunctionalRoleFilter.process(&ctx);
            assert_eq!(output.outcome.state, ProcessingState::Error);
        }
    }

    mod threshold_tests {
        use super::*;

        #[test]
        fn violation_is_reported() {
            let ctx = parsed(&event(
                r#"{"domain": "fault", "functionalRole": "vFW"}"#,
                r#", "cpu": 90, "memory": 50"#,
            ));
            let output = ThresholdEvaluator.process(&ctx);

            assert_eq!(output.outcome.state, ProcessingState::Finished);
            match output.artifact {
                Some(StageArtifact::Evaluation { metrics, violation }) => {
                    assert_eq!(metrics.observed("cpu"), Some(90.0));
                    assert_eq!(violation.unwrap().threshold.field_path, "cpu");
                }
                other => panic!("expected evaluation artifact, got {other:?}"),
            }
        }

        #[test]
        fn unresolved_path_is_skipped() {
            let ctx = parsed(&event(
                r#"{"domain": "fault", "functionalRole": "vFW"}"#,
                r#", "memory": 5"#,
            ));
            let output = ThresholdEvaluator.process(&ctx);

            match output.artifact {
                Some(StageArtifact::Evaluation { violation, .. }) => {
                    assert_eq!(violation.unwrap().threshold.field_path, "memory");
                }
                other => panic!("expected evaluation artifact, got {other:?}"),
            }
        }

        #[test]
        fn no_violation_finishes() {
            let ctx = parsed(&event(
                r#"{"domain": "fault", "functionalRole": "vFW"}"#,
                r#", "cpu": 50, "memory": 50"#,
            ));
            let output = ThresholdEvaluator.process(&ctx);

            assert_eq!(output.outcome.state, ProcessingState::Finished);
            assert!(output
                .outcome
                .message
                .as_deref()
                .is_some_and(|m| m.starts_with("No threshold violation")));
            match output.artifact {
                Some(StageArtifact::Evaluation { violation, .. }) => assert!(violation.is_none()),
                other => panic!("expected evaluation artifact, got {other:?}"),
            }
        }

        #[test]
        fn unknown_role_is_error() {
            let ctx = parsed(&event(r#"{"domain": "fault", "functionalRole": "vDNS"}"#, ""));
            let output = ThresholdEvaluator.process(&ctx);
            assert_eq!(output.outcome.state, ProcessingState::Error);
        }
    }
}
