//! `tca run`: drive the worker pool over an event stream.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::Arc;

use tca_pipeline::{FileStatusSink, StatusSink, StatusTableProperties};
use tca_policy::Policy;
use tracing::info;

use crate::cli::RunArgs;
use crate::config::AppConfig;
use crate::error::CliError;
use crate::output::{OutputFormat, TableDisplay};
use crate::pool::{RunSummary, WorkerPool};

/// Handler for `tca run`.
#[derive(Debug)]
pub struct RunCommand<'a> {
    args: &'a RunArgs,
}

impl<'a> RunCommand<'a> {
    /// Creates a new run command handler.
    #[must_use]
    pub const fn new(args: &'a RunArgs) -> Self {
        Self { args }
    }

    /// Loads configuration and policy, then processes every event.
    ///
    /// # Errors
    ///
    /// Returns an error if start-up fails, the event source cannot be read,
    /// or any status record could not be persisted.
    pub async fn execute<W: Write>(&self, out: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let config = AppConfig::from_file(&self.args.config)?;
        let table = StatusTableProperties::new(config.status_table.time_to_live_secs)?;
        let policy = Arc::new(Policy::from_file(&config.policy_path)?);

        info!(
            subscriber = %config.subscriber.topic_name,
            policy = %config.policy_path.display(),
            domains = %policy.domains_display(),
            functional_roles = %policy.functional_roles_display(),
            "policy loaded"
        );

        let sink: Arc<dyn StatusSink> = Arc::new(FileStatusSink::open(&config.status_table.path)?);
        info!(
            path = %config.status_table.path.display(),
            ttl_secs = table.time_to_live().as_secs(),
            columns = table.columns().len(),
            workers = config.worker_count,
            "status table ready"
        );

        let reader: Box<dyn BufRead + Send> = match &self.args.events {
            Some(path) => Box::new(BufReader::new(File::open(path)?)),
            None => Box::new(BufReader::new(io::stdin())),
        };

        let summary = WorkerPool::new(&policy, &sink, config.worker_count)
            .run(reader)
            .await?;
        format.write(out, &summary)?;

        let failures = summary.persistence_failures();
        if failures > 0 {
            return Err(CliError::Worker(format!(
                "{failures} status record(s) could not be persisted"
            )));
        }
        Ok(())
    }
}

impl TableDisplay for RunSummary {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Run Summary")?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Processed:            {}", self.processed())?;
        writeln!(writer, "  Non-compliant:      {}", self.non_compliant())?;
        writeln!(writer, "  Compliant:          {}", self.compliant())?;
        writeln!(writer, "  Inapplicable:       {}", self.inapplicable())?;
        writeln!(writer, "Persistence failures: {}", self.persistence_failures())?;
        writeln!(writer)?;
        writeln!(
            writer,
            "{:<10} {:>10} {:>14} {:>10} {:>13} {:>9}",
            "WORKER", "PROCESSED", "NON_COMPLIANT", "COMPLIANT", "INAPPLICABLE", "FAILURES"
        )?;
        for w in &self.workers {
            writeln!(
                writer,
                "{:<10} {:>10} {:>14} {:>10} {:>13} {:>9}",
                w.instance_id,
                w.processed,
                w.non_compliant,
                w.compliant,
                w.inapplicable,
                w.persistence_failures
            )?;
        }
        Ok(())
    }
}
