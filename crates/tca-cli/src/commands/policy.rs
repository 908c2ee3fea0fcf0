//! `tca check-policy`: load a policy document and describe it.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tca_policy::{Policy, Severity, Threshold};

use crate::error::CliError;
use crate::output::{OutputFormat, TableDisplay};

/// Handler for `tca check-policy`.
#[derive(Debug)]
pub struct PolicyCommand<'a> {
    path: &'a Path,
}

impl<'a> PolicyCommand<'a> {
    /// Creates a handler for the policy at `path`.
    #[must_use]
    pub const fn new(path: &'a Path) -> Self {
        Self { path }
    }

    /// Loads and validates the policy, then prints its contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the policy cannot be loaded or is invalid.
    pub fn execute<W: Write>(&self, out: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let policy = Policy::from_file(self.path)?;
        format.write(out, &PolicySummary::from(&policy))
    }
}

/// Thresholds of one functional role, in evaluation order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSummary {
    /// The functional role.
    pub functional_role: String,
    /// Most urgent severity among the role's thresholds.
    pub highest_severity: Option<Severity>,
    /// Its thresholds, first match wins.
    pub thresholds: Vec<Threshold>,
}

/// What a policy declares.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySummary {
    /// In-scope domains.
    pub domains: Vec<String>,
    /// In-scope functional roles and their thresholds.
    pub functional_roles: Vec<RoleSummary>,
}

impl From<&Policy> for PolicySummary {
    fn from(policy: &Policy) -> Self {
        Self {
            domains: policy.domains().iter().cloned().collect(),
            functional_roles: policy
                .functional_roles()
                .map(|role| {
                    let thresholds = policy.thresholds_for(role).unwrap_or_default().to_vec();
                    RoleSummary {
                        functional_role: role.to_string(),
                        highest_severity: thresholds
                            .iter()
                            .map(|t| t.severity)
                            .max_by_key(Severity::priority),
                        thresholds,
                    }
                })
                .collect(),
        }
    }
}

impl TableDisplay for PolicySummary {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Domains: {}", self.domains.join(", "))?;
        writeln!(writer)?;
        for role in &self.functional_roles {
            match role.highest_severity {
                Some(severity) => {
                    writeln!(writer, "{} (highest severity: {severity})", role.functional_role)?;
                }
                None => writeln!(writer, "{}", role.functional_role)?,
            }
            for (i, threshold) in role.thresholds.iter().enumerate() {
                write!(writer, "  {}. {threshold}", i + 1)?;
                if let Some(name) = &threshold.control_loop_name {
                    write!(writer, " -> {name}")?;
                }
                writeln!(writer)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;
    use tempfile::TempDir;

    const POLICY: &str = r#"{
        "domains": ["measurementsForVfScaling", "fault"],
        "functionalRoles": {
            "vFirewall": [
                {"fieldPath": "$.event.measurementsForVfScalingFields.vNicUsageArray[0].bytesIn",
                 "direction": "LESS_THAN", "severity": "MAJOR", "thresholdValue": 4000000,
                 "controlLoopName": "ControlLoop-vFirewall"},
                {"fieldPath": "cpu", "direction": "GREATER_THAN", "severity": "CRITICAL", "thresholdValue": 80}
            ]
        }
    }"#;

    fn write_policy(content: &str) -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("policy.json");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn table_lists_thresholds_in_order() {
        let (_dir, path) = write_policy(POLICY);
        let mut out = Vec::new();
        PolicyCommand::new(&path)
            .execute(&mut out, &OutputFormat::default())
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Domains: fault, measurementsForVfScaling"));
        let first = text.find("1. $.event").unwrap();
        let second = text.find("2. cpu > 80 (CRITICAL)").unwrap();
        assert!(first < second);
        assert!(text.contains("-> ControlLoop-vFirewall"));
        assert!(text.contains("vFirewall (highest severity: CRITICAL)"));
    }

    #[test]
    fn json_output() {
        let (_dir, path) = write_policy(POLICY);
        let mut out = Vec::new();
        PolicyCommand::new(&path)
            .execute(&mut out, &OutputFormat::new(Format::Json))
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["functionalRoles"][0]["functionalRole"], "vFirewall");
        assert_eq!(value["functionalRoles"][0]["thresholds"][1]["fieldPath"], "cpu");
        assert_eq!(value["functionalRoles"][0]["highestSeverity"], "CRITICAL");
    }

    #[test]
    fn invalid_policy_is_error() {
        let (_dir, path) = write_policy(r#"{"domains": [], "functionalRoles": {}}"#);
        let err = PolicyCommand::new(&path)
            .execute(&mut Vec::new(), &OutputFormat::default())
            .unwrap_err();
        assert!(matches!(err, CliError::Policy(_)));
    }
}
