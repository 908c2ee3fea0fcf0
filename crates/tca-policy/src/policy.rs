//! The operator policy: which domains and functional roles are in scope and
//! which thresholds apply to each functional role.
//!
//! A [`Policy`] is immutable once built and is meant to be shared read-only
//! (behind an `Arc`) by every concurrent evaluation.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PolicyError, Result};
use crate::types::Threshold;

/// Operator-declared threshold crossing policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Event domains that are in scope.
    domains: BTreeSet<String>,
    /// Ordered thresholds per functional role. The key set is the set of
    /// in-scope functional roles.
    #[serde(rename = "functionalRoles")]
    thresholds_by_functional_role: BTreeMap<String, Vec<Threshold>>,
}

impl Policy {
    /// Creates a new policy builder.
    #[must_use]
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::default()
    }

    /// Parses and validates a policy document.
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::SerializationError` for malformed JSON and
    /// `PolicyError::InvalidPolicy`/`InvalidThreshold` for an unusable policy.
    pub fn from_json(content: &str) -> Result<Self> {
        let policy: Self = serde_json::from_str(content)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Reads, parses and validates a policy document from disk.
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::Io` if the file cannot be read, otherwise the
    /// same errors as [`Policy::from_json`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let policy = Self::from_json(&content)?;
        debug!(
            path = %path.display(),
            domains = policy.domains.len(),
            functional_roles = policy.thresholds_by_functional_role.len(),
            "loaded policy"
        );
        Ok(policy)
    }

    /// Validates the policy.
    ///
    /// # Errors
    ///
    /// Returns an error if no domain or functional role is declared, if a
    /// name is blank, if a functional role has no thresholds, or if any
    /// threshold is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.domains.is_empty() {
            return Err(PolicyError::InvalidPolicy {
                reason: "policy must declare at least one domain".to_string(),
            });
        }

        if self.domains.iter().any(|d| d.trim().is_empty()) {
            return Err(PolicyError::InvalidPolicy {
                reason: "policy domain cannot be blank".to_string(),
            });
        }

        if self.thresholds_by_functional_role.is_empty() {
            return Err(PolicyError::InvalidPolicy {
                reason: "policy must declare at least one functional role".to_string(),
            });
        }

        for (role, thresholds) in &self.thresholds_by_functional_role {
            if role.trim().is_empty() {
                return Err(PolicyError::InvalidPolicy {
                    reason: "functional role cannot be blank".to_string(),
                });
            }
            if thresholds.is_empty() {
                return Err(PolicyError::InvalidPolicy {
                    reason: format!("functional role '{role}' has no thresholds"),
                });
            }
            for threshold in thresholds {
                threshold.validate()?;
            }
        }

        Ok(())
    }

    /// Returns the in-scope domains.
    #[must_use]
    pub const fn domains(&self) -> &BTreeSet<String> {
        &self.domains
    }

    /// Returns the in-scope functional roles.
    pub fn functional_roles(&self) -> impl Iterator<Item = &str> {
        self.thresholds_by_functional_role.keys().map(String::as_str)
    }

    /// Returns true if `domain` is in scope.
    #[must_use]
    pub fn contains_domain(&self, domain: &str) -> bool {
        self.domains.contains(domain)
    }

    /// Returns true if `functional_role` is in scope.
    #[must_use]
    pub fn contains_functional_role(&self, functional_role: &str) -> bool {
        self.thresholds_by_functional_role.contains_key(functional_role)
    }

    /// Returns the thresholds of a functional role in declared order.
    #[must_use]
    pub fn thresholds_for(&self, functional_role: &str) -> Option<&[Threshold]> {
        self.thresholds_by_functional_role
            .get(functional_role)
            .map(Vec::as_slice)
    }

    /// Comma separated list of in-scope domains, for diagnostics.
    #[must_use]
    pub fn domains_display(&self) -> String {
        self.domains
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Comma separated list of in-scope functional roles, for diagnostics.
    #[must_use]
    pub fn functional_roles_display(&self) -> String {
        self.functional_roles().collect::<Vec<_>>().join(",")
    }
}

/// Builder for creating [`Policy`] instances.
#[derive(Debug, Default)]
pub struct PolicyBuilder {
    domains: BTreeSet<String>,
    thresholds_by_functional_role: BTreeMap<String, Vec<Threshold>>,
}

impl PolicyBuilder {
    /// Adds an in-scope domain.
    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domains.insert(domain.into());
        self
    }

    /// Appends a threshold to a functional role, keeping declaration order.
    #[must_use]
    pub fn threshold(mut self, functional_role: impl Into<String>, threshold: Threshold) -> Self {
        self.thresholds_by_functional_role
            .entry(functional_role.into())
            .or_default()
            .push(threshold);
        self
    }

    /// Appends several thresholds to a functional role, keeping their order.
    #[must_use]
    pub fn thresholds(
        mut self,
        functional_role: impl Into<String>,
        thresholds: impl IntoIterator<Item = Threshold>,
    ) -> Self {
        self.thresholds_by_functional_role
            .entry(functional_role.into())
            .or_default()
            .extend(thresholds);
        self
    }

    /// Builds and validates the [`Policy`].
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Policy::validate`].
    pub fn build(self) -> Result<Policy> {
        let policy = Policy {
            domains: self.domains,
            thresholds_by_functional_role: self.thresholds_by_functional_role,
        };
        policy.validate()?;
        Ok(policy)
    }
}
