//! Threshold crossing policy model for telemetry event analytics.
//!
//! `tca-policy` holds everything an operator declares: which event domains
//! and functional roles are in scope and which field thresholds, when
//! crossed, constitute an alert. It also provides the pure first-match
//! threshold evaluator.
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use tca_policy::{
//!     first_violated_threshold, Direction, MetricsPerFunctionalRole, Policy, Severity, Threshold,
//! };
//!
//! let cpu = Threshold::new("cpu", Direction::GreaterThan, Severity::Critical, 80.0).unwrap();
//! let policy = Policy::builder()
//!     .domain("fault")
//!     .threshold("vFW", cpu)
//!     .build()
//!     .unwrap();
//!
//! let thresholds = policy.thresholds_for("vFW").unwrap();
//! let metrics = MetricsPerFunctionalRole::resolve("vFW", thresholds, |path| {
//!     (path == "cpu").then_some(90.0)
//! });
//!
//! let violation = first_violated_threshold(&metrics).unwrap();
//! assert_eq!(violation.threshold.field_path, "cpu");
//! ```
//!
//! # Ordering
//!
//! Threshold order inside a functional role is significant: the first
//! threshold that is crossed wins, regardless of severity.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod evaluator;
pub mod policy;
pub mod types;

pub use error::{PolicyError, Result};
pub use evaluator::{first_violated_threshold, MetricsPerFunctionalRole, ThresholdViolation};
pub use policy::{Policy, PolicyBuilder};
pub use types::{Direction, Severity, Threshold};
