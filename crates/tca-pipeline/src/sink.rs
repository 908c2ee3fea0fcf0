//! Status record sinks.
//!
//! The persister only needs [`StatusSink::put`]. The sinks here also expose
//! ordered prefix scans so audit tooling can list records most recent first.
//!
//! - [`MemoryStatusSink`] keeps rows in a sorted map and evicts rows older
//!   than the table time to live.
//! - [`FileStatusSink`] appends rows as JSON lines.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::error::SinkError;
use crate::key::{Clock, SystemClock};
use crate::status::{StatusRecord, StatusTableProperties};

/// Key-value store that status records are written to.
pub trait StatusSink: Send + Sync + fmt::Debug {
    /// Writes `record` under `key`, replacing any row with the same key.
    ///
    /// # Errors
    ///
    /// Returns a [`SinkError`] if the write did not happen.
    fn put(&self, key: &str, record: &StatusRecord) -> Result<(), SinkError>;
}

/// A stored row: key plus record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRow {
    /// Row key.
    pub key: String,
    /// The stored record.
    pub record: StatusRecord,
}

/// Thread-safe in-memory status table.
pub struct MemoryStatusSink {
    rows: RwLock<BTreeMap<String, StatusRecord>>,
    time_to_live: Option<Duration>,
    clock: Arc<dyn Clock>,
}

impl MemoryStatusSink {
    /// Creates a sink that never evicts.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            time_to_live: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Creates a sink that evicts rows older than the table time to live.
    #[must_use]
    pub fn with_properties(properties: &StatusTableProperties) -> Self {
        Self {
            time_to_live: Some(properties.time_to_live()),
            ..Self::new()
        }
    }

    /// Replaces the clock used for eviction.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the record stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<StatusRecord> {
        self.rows.read().get(key).cloned()
    }

    /// Returns up to `limit` rows whose key starts with `prefix`, in ascending
    /// key order. For a single message type that is most recent first.
    #[must_use]
    pub fn scan(&self, prefix: &str, limit: usize) -> Vec<StatusRow> {
        self.rows
            .read()
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .take(limit)
            .map(|(key, record)| StatusRow {
                key: key.clone(),
                record: record.clone(),
            })
            .collect()
    }

    /// Returns the number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Returns `true` if no rows are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Removes rows whose timestamp is older than the time to live.
    pub fn enforce_retention(&self) {
        let Some(ttl) = self.time_to_live else {
            return;
        };
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let cutoff = self.clock.now_millis().saturating_sub(ttl_millis);

        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|_, record| record.timestamp_millis >= cutoff);
        let removed = before - rows.len();
        if removed > 0 {
            tracing::debug!(removed, "evicted expired status records");
        }
    }
}

impl Default for MemoryStatusSink {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryStatusSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStatusSink")
            .field("rows", &self.len())
            .field("time_to_live", &self.time_to_live)
            .finish_non_exhaustive()
    }
}

impl StatusSink for MemoryStatusSink {
    fn put(&self, key: &str, record: &StatusRecord) -> Result<(), SinkError> {
        self.enforce_retention();
        self.rows.write().insert(key.to_string(), record.clone());
        Ok(())
    }
}

/// Append-only JSON-lines status table.
///
/// A later line with the same key replaces an earlier one when read back.
pub struct FileStatusSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileStatusSink {
    /// Opens (or creates) the table file for appending.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or its parent directory cannot be created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Returns the table file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every live row of a table file, in ascending key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a line is not a row.
    pub fn read_rows(path: impl AsRef<Path>) -> Result<Vec<StatusRow>, SinkError> {
        let reader = BufReader::new(File::open(path)?);
        let mut rows = BTreeMap::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let row: StatusRow = serde_json::from_str(&line)?;
            rows.insert(row.key.clone(), row);
        }
        Ok(rows.into_values().collect())
    }

    /// Returns up to `limit` rows whose key starts with `prefix`, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn scan(
        path: impl AsRef<Path>,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<StatusRow>, SinkError> {
        Ok(Self::read_rows(path)?
            .into_iter()
            .filter(|row| row.key.starts_with(prefix))
            .take(limit)
            .collect())
    }
}

impl fmt::Debug for FileStatusSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStatusSink")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl StatusSink for FileStatusSink {
    fn put(&self, key: &str, record: &StatusRecord) -> Result<(), SinkError> {
        let row = StatusRow {
            key: key.to_string(),
            record: record.clone(),
        };
        let line = serde_json::to_string(&row)?;

        let mut writer = self.writer.lock();
        writeln!(writer, "{line}")?;
        writer.flush()?;
        Ok(())
    }
}
