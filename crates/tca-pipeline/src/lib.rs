//! Per-event threshold crossing pipeline.
//!
//! `tca-pipeline` takes one raw CEF/VES event at a time through a
//! short-circuiting chain of four stages, builds a flat audit record of
//! what every stage decided, and writes it under a recency-sortable key.
//!
//! # Stages
//!
//! 1. Envelope validation
//! 2. Domain filter
//! 3. Functional role filter
//! 4. Threshold evaluation
//!
//! A stage that finds the event out of scope records TERMINATED, one that
//! cannot evaluate it records ERROR. Either stops the chain, but the event is
//! still persisted.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tca_pipeline::{MemoryStatusSink, MessageType, StatusPersister};
//! use tca_policy::{Direction, Policy, Severity, Threshold};
//!
//! let cpu = Threshold::new("cpu", Direction::GreaterThan, Severity::Critical, 80.0).unwrap();
//! let policy = Arc::new(Policy::builder().domain("fault").threshold("vFW", cpu).build().unwrap());
//! let sink = Arc::new(MemoryStatusSink::new());
//!
//! let persister = StatusPersister::new(policy, sink.clone(), 0);
//! let record = persister
//!     .process(r#"{"event": {"commonEventHeader": {"domain": "fault", "functionalRole": "vFW"}, "cpu": 90}}"#)
//!     .unwrap();
//!
//! assert_eq!(record.message_type, MessageType::NonCompliant);
//! assert_eq!(sink.len(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod chain;
pub mod context;
pub mod envelope;
pub mod error;
pub mod key;
pub mod persister;
pub mod sink;
pub mod stages;
pub mod status;

pub use chain::ProcessorChain;
pub use context::{
    MessageType, ProcessingContext, ProcessingOutcome, ProcessingState, StageArtifact, StageName,
    StageOutput, StageSignal,
};
pub use envelope::{CommonEventHeader, EventEnvelope};
pub use error::{EnvelopeError, PipelineError, Result, SinkError};
pub use key::{
    decode_timestamp, row_key, row_key_prefix, Clock, FixedClock, SystemClock, ROW_KEY_DELIMITER,
};
pub use persister::StatusPersister;
pub use sink::{FileStatusSink, MemoryStatusSink, StatusRow, StatusSink};
pub use stages::{DomainFilter, EnvelopeValidator, FunctionalRoleFilter, Stage, ThresholdEvaluator};
pub use status::{RecordMeta, StatusRecord, StatusTableProperties};
