//! `tca audit`: list status records, most recent first.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tca_pipeline::{
    decode_timestamp, row_key_prefix, FileStatusSink, MessageType, StageName, StatusRecord,
    StatusRow,
};

use crate::cli::AuditArgs;
use crate::error::CliError;
use crate::output::{OutputFormat, TableDisplay};

/// Handler for `tca audit`.
#[derive(Debug)]
pub struct AuditCommand<'a> {
    args: &'a AuditArgs,
}

impl<'a> AuditCommand<'a> {
    /// Creates a new audit command handler.
    #[must_use]
    pub const fn new(args: &'a AuditArgs) -> Self {
        Self { args }
    }

    /// Prints the newest records in the status table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub fn execute<W: Write>(&self, out: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let rows = match self.args.message_type {
            Some(message_type) => FileStatusSink::scan(
                &self.args.store,
                &row_key_prefix(MessageType::from(message_type)),
                self.args.limit,
            )?,
            None => {
                let mut rows = FileStatusSink::read_rows(&self.args.store)?;
                rows.sort_by_key(|row| std::cmp::Reverse(row_time(row)));
                rows.truncate(self.args.limit);
                rows
            }
        };

        let list = AuditList {
            records: rows.iter().map(AuditEntry::from).collect(),
        };
        format.write(out, &list)
    }
}

fn row_time(row: &StatusRow) -> i64 {
    decode_timestamp(&row.key).unwrap_or(row.record.timestamp_millis)
}

/// One line of the audit trail.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// Row key.
    pub row_key: String,
    /// Processing time, RFC 3339.
    pub time: String,
    /// Message type.
    pub message_type: MessageType,
    /// Worker instance.
    pub instance_id: u32,
    /// Event domain, if known.
    pub domain: Option<String>,
    /// Event functional role, if known.
    pub functional_role: Option<String>,
    /// Last stage that ran and its state.
    pub last_stage: Option<String>,
    /// Violated threshold, if any.
    pub violation: Option<String>,
}

impl From<&StatusRow> for AuditEntry {
    fn from(row: &StatusRow) -> Self {
        let record = &row.record;
        Self {
            row_key: row.key.clone(),
            time: format_millis(row_time(row)),
            message_type: record.message_type,
            instance_id: record.instance_id,
            domain: record.domain.clone(),
            functional_role: record.functional_role.clone(),
            last_stage: last_stage(record),
            violation: violation(record),
        }
    }
}

fn format_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map_or_else(|| millis.to_string(), |t| t.to_rfc3339())
}

fn last_stage(record: &StatusRecord) -> Option<String> {
    StageName::ALL.iter().rev().find_map(|stage| {
        record
            .stage_status(*stage)
            .map(|state| format!("{stage}={state}"))
    })
}

fn violation(record: &StatusRecord) -> Option<String> {
    let path = record.threshold_field_path.as_deref()?;
    Some(format!(
        "{path} {} {} ({}), observed {}",
        record.threshold_direction.as_deref().unwrap_or_default(),
        record.threshold_value.unwrap_or_default(),
        record.threshold_severity.as_deref().unwrap_or_default(),
        record.observed_value.unwrap_or_default()
    ))
}

/// Audit trail listing.
#[derive(Debug, Serialize)]
pub struct AuditList {
    /// Entries, most recent first.
    pub records: Vec<AuditEntry>,
}

impl TableDisplay for AuditList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.records.is_empty() {
            writeln!(writer, "No status records found")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<32} {:<14} {:<4} {:<26} {:<12} DETAIL",
            "TIME", "TYPE", "INST", "DOMAIN", "ROLE"
        )?;
        for entry in &self.records {
            let detail = entry
                .violation
                .as_deref()
                .or(entry.last_stage.as_deref())
                .unwrap_or("-");
            writeln!(
                writer,
                "{:<32} {:<14} {:<4} {:<26} {:<12} {detail}",
                entry.time,
                entry.message_type.as_str(),
                entry.instance_id,
                entry.domain.as_deref().unwrap_or("-"),
                entry.functional_role.as_deref().unwrap_or("-"),
            )?;
        }
        Ok(())
    }
}
