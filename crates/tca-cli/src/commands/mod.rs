//! CLI command implementations.
//!
//! - [`run`] - Event stream processing
//! - [`config`] - Configuration validation and scaffolding
//! - [`policy`] - Policy inspection
//! - [`audit`] - Status record listing

pub mod audit;
pub mod config;
pub mod policy;
pub mod run;

pub use audit::AuditCommand;
pub use config::ConfigCommand;
pub use policy::PolicyCommand;
pub use run::RunCommand;
