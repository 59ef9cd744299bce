//! # Deployment Context
//!
//! Account, region, zones and the named context parameters a deployment run
//! is synthesized for. Loaded by the app layer from `fisgraph.toml`.

use crate::primitives::KNOWN_PARAMS;
use crate::FisgraphError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_stack_name() -> String {
    "FIS".to_string()
}

/// Environment and parameters shared by every unit of a deployment run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentContext {
    /// Target AWS account id.
    pub account: String,
    /// Target region.
    pub region: String,
    /// Name of the parent stack; prefixes every physical name.
    #[serde(default = "default_stack_name")]
    pub stack_name: String,
    /// Zones eligible for AZ-scoped faults, in a stable order.
    #[serde(default)]
    pub availability_zones: Vec<String>,
    /// Named context parameters (`vpc_id`, `asg_name`, ...).
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl DeploymentContext {
    /// Create a context with no zones and no parameters.
    #[must_use]
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            region: region.into(),
            stack_name: default_stack_name(),
            availability_zones: Vec::new(),
            params: BTreeMap::new(),
        }
    }

    /// Set the parent stack name.
    #[must_use]
    pub fn with_stack_name(mut self, name: impl Into<String>) -> Self {
        self.stack_name = name.into();
        self
    }

    /// Set the eligible availability zones.
    #[must_use]
    pub fn with_zones<I, S>(mut self, zones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.availability_zones = zones.into_iter().map(Into::into).collect();
        self
    }

    /// Set one context parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Look up a parameter. Blank values count as absent.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Look up a parameter that must be present.
    pub fn require(&self, key: &str) -> Result<&str, FisgraphError> {
        self.param(key)
            .ok_or_else(|| FisgraphError::MissingParameter(key.to_string()))
    }

    /// Parameter keys the catalog does not recognize.
    pub fn unknown_params(&self) -> Vec<&str> {
        self.params
            .keys()
            .map(String::as_str)
            .filter(|k| !KNOWN_PARAMS.contains(k))
            .collect()
    }

    /// Validate the environment fields.
    pub fn validate(&self) -> Result<(), FisgraphError> {
        if self.account.trim().is_empty() {
            return Err(FisgraphError::InvalidConfig("account is empty".to_string()));
        }
        if !self.account.chars().all(|c| c.is_ascii_digit()) {
            return Err(FisgraphError::InvalidConfig(format!(
                "account `{}` is not numeric",
                self.account
            )));
        }
        if self.region.trim().is_empty() {
            return Err(FisgraphError::InvalidConfig("region is empty".to_string()));
        }
        if self.stack_name.trim().is_empty() {
            return Err(FisgraphError::InvalidConfig(
                "stack_name is empty".to_string(),
            ));
        }
        if let Some(blank) = self.availability_zones.iter().find(|z| z.trim().is_empty()) {
            return Err(FisgraphError::InvalidConfig(format!(
                "blank availability zone `{}`",
                blank
            )));
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Naming
    // -------------------------------------------------------------------------

    /// Physical name of a resource: `<stack>-<unit>-<logical id>`.
    #[must_use]
    pub fn physical_name(&self, unit: &str, logical_id: &str) -> String {
        format!("{}-{}-{}", self.stack_name, unit, logical_id)
    }

    /// ARN of an IAM role in this account.
    #[must_use]
    pub fn role_arn(&self, role_name: &str) -> String {
        format!("arn:aws:iam::{}:role/{}", self.account, role_name)
    }

    /// ARN of a customer-managed IAM policy in this account.
    #[must_use]
    pub fn policy_arn(&self, policy_name: &str) -> String {
        format!("arn:aws:iam::{}:policy/{}", self.account, policy_name)
    }

    /// ARN of an SSM document owned by this account.
    #[must_use]
    pub fn document_arn(&self, document_name: &str) -> String {
        format!(
            "arn:aws:ssm:{}:{}:document/{}",
            self.region, self.account, document_name
        )
    }

    /// ARN of an AWS-owned SSM document (no account segment).
    #[must_use]
    pub fn aws_document_arn(&self, document_name: &str) -> String {
        format!("arn:aws:ssm:{}::document/{}", self.region, document_name)
    }

    /// ARN of an SSM parameter in this account.
    #[must_use]
    pub fn parameter_arn(&self, parameter_name: &str) -> String {
        format!(
            "arn:aws:ssm:{}:{}:parameter/{}",
            self.region,
            self.account,
            parameter_name.trim_start_matches('/')
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================
