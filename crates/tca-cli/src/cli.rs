//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tca_pipeline::MessageType;

/// Threshold crossing analytics for CEF/VES telemetry events.
#[derive(Parser, Debug, Clone)]
#[command(name = "tca")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table, global = true)]
    pub format: Format,

    /// Emit logs as JSON.
    #[arg(long, env = "TCA_LOG_JSON", global = true)]
    pub log_json: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Evaluate a stream of events and persist one status record per event.
    Run(RunArgs),

    /// Validate an application configuration file.
    ValidateConfig {
        /// Path to the configuration file.
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Load a policy document and show what it declares.
    CheckPolicy {
        /// Path to the policy document.
        #[arg(short, long)]
        policy: PathBuf,
    },

    /// List persisted status records, most recent first.
    Audit(AuditArgs),

    /// Write a sample configuration file.
    InitConfig {
        /// Path to write the configuration to.
        #[arg(short, long, default_value = "tca.json")]
        output: PathBuf,
    },
}

/// Arguments for `tca run`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Path to the configuration file.
    #[arg(short, long, env = "TCA_CONFIG")]
    pub config: PathBuf,

    /// File of JSON-lines events. Reads standard input when omitted.
    #[arg(short, long)]
    pub events: Option<PathBuf>,
}

/// Arguments for `tca audit`.
#[derive(Args, Debug, Clone)]
pub struct AuditArgs {
    /// Path to the status table file.
    #[arg(short, long)]
    pub store: PathBuf,

    /// Only show records of this type.
    #[arg(short, long, value_enum)]
    pub message_type: Option<MessageTypeArg>,

    /// Maximum number of records to show.
    #[arg(short, long, default_value_t = 20)]
    pub limit: usize,
}

/// Message type filter for `tca audit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MessageTypeArg {
    /// Stopped before threshold evaluation.
    Inapplicable,
    /// In scope with no violation.
    Compliant,
    /// Violated a threshold.
    NonCompliant,
}

impl From<MessageTypeArg> for MessageType {
    fn from(arg: MessageTypeArg) -> Self {
        match arg {
            MessageTypeArg::Inapplicable => Self::Inapplicable,
            MessageTypeArg::Compliant => Self::Compliant,
            MessageTypeArg::NonCompliant => Self::NonCompliant,
        }
    }
}
