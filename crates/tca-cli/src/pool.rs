//! Parallel worker pool.
//!
//! Each worker is a blocking task with its own [`StatusPersister`]; all of
//! them share one policy and one sink. Events are dealt out round-robin,
//! so events on the same worker are persisted in arrival order and there is
//! no ordering between workers.

use std::io::BufRead;
use std::sync::Arc;

use serde::Serialize;
use tca_pipeline::{MessageType, StatusPersister, StatusRecord, StatusSink};
use tca_policy::Policy;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::alert::attach_alert;
use crate::error::CliError;

/// Events buffered per worker before the reader blocks.
pub const WORKER_QUEUE_DEPTH: usize = 256;

/// Upper bound on workers in one pool.
///
/// Every worker and the event reader each hold a blocking thread for the
/// whole run, so the pool must stay well under the runtime's blocking
/// thread limit (512 by default).
pub const MAX_WORKER_COUNT: usize = 256;

/// Counts kept by one worker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSummary {
    /// Worker instance id.
    pub instance_id: u32,
    /// Events taken off the queue.
    pub processed: u64,
    /// Events that stopped before threshold evaluation.
    pub inapplicable: u64,
    /// In-scope events with no violation.
    pub compliant: u64,
    /// Events that violated a threshold.
    pub non_compliant: u64,
    /// Events whose status record could not be written.
    pub persistence_failures: u64,
}

impl WorkerSummary {
    fn new(instance_id: u32) -> Self {
        Self {
            instance_id,
            ..Self::default()
        }
    }

    fn record(&mut self, record: &StatusRecord) {
        match record.message_type {
            MessageType::Inapplicable => self.inapplicable += 1,
            MessageType::Compliant => self.compliant += 1,
            MessageType::NonCompliant => self.non_compliant += 1,
        }
    }
}

/// Totals across all workers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Per-worker counts, ordered by instance id.
    pub workers: Vec<WorkerSummary>,
}

impl RunSummary {
    fn total(&self, f: impl Fn(&WorkerSummary) -> u64) -> u64 {
        self.workers.iter().map(f).sum()
    }

    /// Total events processed.
    #[must_use]
    pub fn processed(&self) -> u64 {
        self.total(|w| w.processed)
    }

    /// Total inapplicable events.
    #[must_use]
    pub fn inapplicable(&self) -> u64 {
        self.total(|w| w.inapplicable)
    }

    /// Total compliant events.
    #[must_use]
    pub fn compliant(&self) -> u64 {
        self.total(|w| w.compliant)
    }

    /// Total non-compliant events.
    #[must_use]
    pub fn non_compliant(&self) -> u64 {
        self.total(|w| w.non_compliant)
    }

    /// Total persistence failures.
    #[must_use]
    pub fn persistence_failures(&self) -> u64 {
        self.total(|w| w.persistence_failures)
    }
}

/// A fixed set of workers fed from one event stream.
#[derive(Debug)]
pub struct WorkerPool {
    persisters: Vec<StatusPersister>,
}

impl WorkerPool {
    /// Creates `worker_count` workers with instance ids `0..worker_count`,
    /// clamped to `1..=MAX_WORKER_COUNT`.
    #[must_use]
    pub fn new(policy: &Arc<Policy>, sink: &Arc<dyn StatusSink>, worker_count: usize) -> Self {
        let persisters = (0..worker_count.clamp(1, MAX_WORKER_COUNT))
            .map(|i| {
                let instance_id = u32::try_from(i).unwrap_or(u32::MAX);
                StatusPersister::new(Arc::clone(policy), Arc::clone(sink), instance_id)
            })
            .collect();
        Self { persisters }
    }

    /// Builds a pool from pre-configured persisters.
    #[must_use]
    pub fn from_persisters(persisters: Vec<StatusPersister>) -> Self {
        Self { persisters }
    }

    /// Returns the number of workers.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.persisters.len()
    }

    /// Reads one event per non-blank line and processes all of them.
    ///
    /// A persistence failure is logged and counted; the worker carries on
    /// with the next event.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool has more than [`MAX_WORKER_COUNT`]
    /// workers, reading the input fails, or a worker task panics.
    pub async fn run<R>(self, reader: R) -> Result<RunSummary, CliError>
    where
        R: BufRead + Send + 'static,
    {
        if self.persisters.is_empty() {
            return Ok(RunSummary::default());
        }
        if self.persisters.len() > MAX_WORKER_COUNT {
            return Err(CliError::Worker(format!(
                "{} workers requested, at most {MAX_WORKER_COUNT} are supported",
                self.persisters.len()
            )));
        }

        let mut senders = Vec::with_capacity(self.persisters.len());
        let mut workers: Vec<JoinHandle<WorkerSummary>> = Vec::with_capacity(self.persisters.len());
        for persister in self.persisters {
            let (tx, rx) = mpsc::channel::<String>(WORKER_QUEUE_DEPTH);
            senders.push(tx);
            workers.push(tokio::task::spawn_blocking(move || work(&persister, rx)));
        }

        let dispatcher = tokio::task::spawn_blocking(move || dispatch(reader, &senders));

        let read_result = dispatcher
            .await
            .map_err(|e| CliError::Worker(format!("event reader failed: {e}")))?;

        let mut summary = RunSummary::default();
        for worker in workers {
            let worker_summary = worker
                .await
                .map_err(|e| CliError::Worker(format!("worker failed: {e}")))?;
            summary.workers.push(worker_summary);
        }
        summary.workers.sort_by_key(|w| w.instance_id);

        let dispatched = read_result?;
        info!(
            dispatched,
            processed = summary.processed(),
            non_compliant = summary.non_compliant(),
            persistence_failures = summary.persistence_failures(),
            "event stream drained"
        );
        Ok(summary)
    }
}

/// Processes one raw event: evaluate, attach alert text, persist.
///
/// # Errors
///
/// Returns the persistence failure, if any.
pub fn process_event(
    persister: &StatusPersister,
    raw_event: &str,
) -> Result<StatusRecord, tca_pipeline::PipelineError> {
    let context = attach_alert(persister.evaluate(raw_event));
    persister.persist(context)
}

fn work(persister: &StatusPersister, mut rx: mpsc::Receiver<String>) -> WorkerSummary {
    let mut summary = WorkerSummary::new(persister.instance_id());

    while let Some(raw_event) = rx.blocking_recv() {
        summary.processed += 1;
        match process_event(persister, &raw_event) {
            Ok(record) => summary.record(&record),
            Err(e) => {
                summary.persistence_failures += 1;
                error!(instance_id = persister.instance_id(), error = %e, "event audit record lost");
            }
        }
    }

    info!(
        instance_id = summary.instance_id,
        processed = summary.processed,
        "worker finished"
    );
    summary
}

fn dispatch<R: BufRead>(reader: R, senders: &[mpsc::Sender<String>]) -> Result<u64, CliError> {
    let mut dispatched = 0u64;
    let mut next = 0usize;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if senders[next].blocking_send(line).is_err() {
            warn!(worker = next, "worker queue closed, stopping event reader");
            break;
        }
        dispatched += 1;
        next = (next + 1) % senders.len();
    }

    Ok(dispatched)
}
