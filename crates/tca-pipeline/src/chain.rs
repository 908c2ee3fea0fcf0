//! The short-circuiting stage chain.

use tracing::debug;

use crate::context::{ProcessingContext, StageName, StageSignal};
use crate::stages::{DomainFilter, EnvelopeValidator, FunctionalRoleFilter, Stage, ThresholdEvaluator};

/// Runs stages in a fixed order, stopping at the first TERMINATED or ERROR outcome.
#[derive(Debug)]
pub struct ProcessorChain {
    stages: Vec<Box<dyn Stage>>,
}

impl ProcessorChain {
    /// The standard four-stage chain: envelope, domain, functional role, thresholds.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            stages: vec![
                Box::new(EnvelopeValidator),
                Box::new(DomainFilter),
                Box::new(FunctionalRoleFilter),
                Box::new(ThresholdEvaluator),
            ],
        }
    }

    /// Builds a chain from arbitrary stages, run in the given order.
    #[must_use]
    pub fn with_stages(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<StageName> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Folds the context through the stages until one signals stop.
    #[must_use]
    pub fn run(&self, mut context: ProcessingContext) -> ProcessingContext {
        for stage in &self.stages {
            let output = stage.process(&context);
            debug!(
                stage = %output.outcome.stage,
                state = %output.outcome.state,
                message = output.outcome.message.as_deref().unwrap_or_default(),
                "stage complete"
            );

            let (next, signal) = context.apply(output);
            context = next;
            if signal == StageSignal::Stop {
                break;
            }
        }
        context
    }
}

impl Default for ProcessorChain {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ProcessingOutcome, ProcessingState, StageOutput};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tca_policy::{Direction, Policy, Severity, Threshold};

    fn policy() -> Arc<Policy> {
        Arc::new(
            Policy::builder()
                .domain("fault")
                .threshold(
                    "vFW",
                    Threshold::new("cpu", Direction::GreaterThan, Severity::Critical, 80.0)
                        .unwrap(),
                )
                .build()
                .unwrap(),
        )
    }

    fn run(raw: &str) -> ProcessingContext {
        ProcessorChain::standard().run(ProcessingContext::new(raw, policy()))
    }

    fn states(ctx: &ProcessingContext) -> Vec<(StageName, ProcessingState)> {
        ctx.outcomes().iter().map(|o| (o.stage, o.state)).collect()
    }

    /// A stage that counts invocations and always finishes.
    #[derive(Debug)]
    struct CountingStage {
        calls: Arc<AtomicUsize>,
    }

    impl Stage for CountingStage {
        fn name(&self) -> StageName {
            StageName::ThresholdEvaluation
        }

        fn description(&self) -> &'static str {
            "counts"
        }

        fn process(&self, _context: &ProcessingContext) -> StageOutput {
            self.calls.fetch_add(1, Ordering::SeqCst);
            StageOutput::outcome(ProcessingOutcome::finished(self.name(), "counted"))
        }
    }

    #[test]
    fn standard_order() {
        assert_eq!(ProcessorChain::standard().stage_names(), StageName::ALL.to_vec());
    }

    #[test]
    fn all_stages_run_for_in_scope_event() {
        let ctx = run(
            r#"{"event": {"commonEventHeader": {"domain": "fault", "functionalRole": "vFW"}, "cpu": 90}}"#,
        );
        assert_eq!(
            states(&ctx),
            StageName::ALL
                .iter()
                .map(|s| (*s, ProcessingState::Finished))
                .collect::<Vec<_>>()
        );
        assert!(ctx.violation().is_some());
    }

    #[test]
    fn stops_after_domain_termination() {
        let ctx = run(r#"{"event": {"commonEventHeader": {"domain": "heartbeat", "functionalRole": "vFW"}}}"#);
        assert_eq!(
            states(&ctx),
            vec![
                (StageName::EnvelopeValidation, ProcessingState::Finished),
                (StageName::DomainFilter, ProcessingState::Terminated),
            ]
        );
    }

    #[test]
    fn stops_after_envelope_error() {
        let ctx = run("not json");
        assert_eq!(
            states(&ctx),
            vec![(StageName::EnvelopeValidation, ProcessingState::Error)]
        );
        assert!(ctx.envelope().is_none());
    }

    #[test]
    fn stops_after_missing_role() {
        let ctx = run(r#"{"event": {"commonEventHeader": {"domain": "fault"}}}"#);
        assert_eq!(ctx.outcomes().len(), 3);
        assert_eq!(
            ctx.outcome(StageName::FunctionalRoleFilter).map(|o| o.state),
            Some(ProcessingState::Error)
        );
        assert!(ctx.outcome(StageName::ThresholdEvaluation).is_none());
    }

    #[test]
    fn stopped_chain_skips_later_stages() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = ProcessorChain::with_stages(vec![
            Box::new(EnvelopeValidator),
            Box::new(CountingStage {
                calls: Arc::clone(&calls),
            }),
        ]);

        let _ = chain.run(ProcessingContext::new("", policy()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let _ = chain.run(ProcessingContext::new(
            r#"{"event": {"commonEventHeader": {}}}"#,
            policy(),
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
