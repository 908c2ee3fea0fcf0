//! The per-worker orchestrator: chain, record, key, write.

use std::sync::Arc;

use tca_policy::Policy;
use tracing::{debug, info_span, warn, Span};

use crate::chain::ProcessorChain;
use crate::context::ProcessingContext;
use crate::error::{PipelineError, Result};
use crate::key::{row_key, Clock, SystemClock};
use crate::sink::StatusSink;
use crate::status::{RecordMeta, StatusRecord};

/// Runs events through the chain and writes exactly one status record each.
///
/// One persister is built per worker. It owns the worker's tracing span and
/// shares the policy and sink with the other workers.
#[derive(Debug)]
pub struct StatusPersister {
    chain: ProcessorChain,
    policy: Arc<Policy>,
    sink: Arc<dyn StatusSink>,
    clock: Arc<dyn Clock>,
    instance_id: u32,
    span: Span,
}

impl StatusPersister {
    /// Creates a persister with the standard chain and the system clock.
    #[must_use]
    pub fn new(policy: Arc<Policy>, sink: Arc<dyn StatusSink>, instance_id: u32) -> Self {
        Self {
            chain: ProcessorChain::standard(),
            policy,
            sink,
            clock: Arc::new(SystemClock),
            instance_id,
            span: info_span!("status_persister", instance_id),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the stage chain.
    #[must_use]
    pub fn with_chain(mut self, chain: ProcessorChain) -> Self {
        self.chain = chain;
        self
    }

    /// Replaces the tracing span events are processed under.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Returns the worker instance id.
    #[must_use]
    pub const fn instance_id(&self) -> u32 {
        self.instance_id
    }

    /// Returns the shared policy.
    #[must_use]
    pub fn policy(&self) -> &Arc<Policy> {
        &self.policy
    }

    /// Runs the stage chain for one raw event. Never fails: malformed input
    /// ends up as an ERROR outcome in the returned context.
    #[must_use]
    pub fn evaluate(&self, raw_event: &str) -> ProcessingContext {
        let _entered = self.span.enter();
        self.chain
            .run(ProcessingContext::new(raw_event, Arc::clone(&self.policy)))
    }

    /// Builds the status record for a completed context and writes it.
    ///
    /// The context is consumed. Exactly one write is attempted.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Persistence`] if the sink write fails. The
    /// write is not retried.
    pub fn persist(&self, context: ProcessingContext) -> Result<StatusRecord> {
        let _entered = self.span.enter();

        let timestamp_millis = self.clock.now_millis();
        let message_type = context.message_type();
        let key = row_key(message_type, timestamp_millis);
        let record = StatusRecord::from_context(
            &context,
            RecordMeta {
                row_key: key.clone(),
                timestamp_millis,
                instance_id: self.instance_id,
            },
        );
        drop(context);

        if let Err(source) = self.sink.put(&key, &record) {
            warn!(row_key = %key, error = %source, "failed to persist status record");
            return Err(PipelineError::Persistence {
                row_key: key,
                source,
            });
        }

        debug!(row_key = %key, message_type = %message_type, "status record persisted");
        Ok(record)
    }

    /// Evaluates and persists one raw event.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Persistence`] if the sink write fails.
    pub fn process(&self, raw_event: &str) -> Result<StatusRecord> {
        self.persist(self.evaluate(raw_event))
    }
}
