//! # tca-cli
//!
//! The `tca` command-line tool.
//!
//! Provides commands for:
//! - Running the threshold crossing pipeline over a stream of events
//! - Validating application configuration
//! - Inspecting policy documents
//! - Listing the status record audit trail
//!
//! # Architecture
//!
//! ```text
//! events ──► dispatcher ──round robin──► worker 0 ─┐
//!                                    └──► worker n ─┴──► status table
//! ```
//!
//! Every worker owns a `StatusPersister`; the policy and the status table
//! are shared.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod alert;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod pool;

pub use alert::{attach_alert, ThresholdAlert};
pub use cli::{AuditArgs, Cli, Commands, Format, MessageTypeArg, RunArgs};
pub use config::{AppConfig, EndpointConfig, FieldError, StatusTableConfig, ValidationReport};
pub use error::CliError;
pub use output::OutputFormat;
pub use pool::{process_event, RunSummary, WorkerPool, WorkerSummary};
