//! `tca validate-config` and `tca init-config`.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::config::{AppConfig, ValidationReport};
use crate::error::CliError;
use crate::output::{OutputFormat, TableDisplay};

/// Handler for configuration commands.
#[derive(Debug)]
pub struct ConfigCommand<'a> {
    path: &'a Path,
}

impl<'a> ConfigCommand<'a> {
    /// Creates a handler for the configuration file at `path`.
    #[must_use]
    pub const fn new(path: &'a Path) -> Self {
        Self { path }
    }

    /// Validates the file and prints every problem found.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or is invalid.
    pub fn validate<W: Write>(&self, out: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let config = AppConfig::load(self.path)?;
        let report = config.validate();
        format.write(out, &report)?;
        report.into_result()
    }

    /// Writes a sample configuration, refusing to overwrite an existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists or cannot be written.
    pub fn init<W: Write>(&self, out: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        if self.path.exists() {
            return Err(CliError::Config(format!(
                "'{}' already exists",
                self.path.display()
            )));
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(self.path, AppConfig::sample().to_json()?)?;

        let response = InitConfigResponse {
            path: self.path.display().to_string(),
        };
        format.write(out, &response)
    }
}

impl TableDisplay for ValidationReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.is_valid() {
            writeln!(writer, "Configuration is valid")?;
            return Ok(());
        }
        writeln!(writer, "Configuration has {} problem(s):", self.errors().len())?;
        for error in self.errors() {
            writeln!(writer, "  {:<28} {}", error.field, error.message)?;
        }
        Ok(())
    }
}

/// Result of `tca init-config`.
#[derive(Debug, Serialize)]
pub struct InitConfigResponse {
    /// Where the configuration was written.
    pub path: String,
}

impl TableDisplay for InitConfigResponse {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Config written to {}", self.path)?;
        writeln!(writer)?;
        writeln!(writer, "Point policyPath at your policy document, then run:")?;
        writeln!(writer, "  tca run --config {}", self.path)?;
        Ok(())
    }
}
