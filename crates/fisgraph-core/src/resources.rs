//! # Resource Records
//!
//! Plain data records for everything a unit materializes. Handles are never
//! live SDK objects: an ARN or a name is just a `String`.

use crate::template::ExperimentTemplate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One materialized resource, tagged by kind in the assembly JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resource {
    IamRole(RoleSpec),
    ManagedPolicy(PolicySpec),
    Alarm(AlarmSpec),
    SsmDocument(DocumentSpec),
    LogGroup(LogGroupSpec),
    Bucket(BucketSpec),
    ExperimentTemplate(ExperimentTemplate),
}

impl Resource {
    /// Logical id of the resource within its unit.
    #[must_use]
    pub fn logical_id(&self) -> &str {
        match self {
            Self::IamRole(r) => &r.logical_id,
            Self::ManagedPolicy(p) => &p.logical_id,
            Self::Alarm(a) => &a.logical_id,
            Self::SsmDocument(d) => &d.logical_id,
            Self::LogGroup(l) => &l.logical_id,
            Self::Bucket(b) => &b.logical_id,
            Self::ExperimentTemplate(t) => &t.logical_id,
        }
    }

    /// Short kind name, matching the serialized tag.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IamRole(_) => "iam_role",
            Self::ManagedPolicy(_) => "managed_policy",
            Self::Alarm(_) => "alarm",
            Self::SsmDocument(_) => "ssm_document",
            Self::LogGroup(_) => "log_group",
            Self::Bucket(_) => "bucket",
            Self::ExperimentTemplate(_) => "experiment_template",
        }
    }

    /// The experiment template, if this resource is one.
    #[must_use]
    pub fn as_template(&self) -> Option<&ExperimentTemplate> {
        match self {
            Self::ExperimentTemplate(t) => Some(t),
            _ => None,
        }
    }
}

// =============================================================================
// IAM
// =============================================================================

/// Statement effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// Condition block: operator -> (condition key -> value).
pub type Conditions = BTreeMap<String, BTreeMap<String, String>>;

/// One IAM policy statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStatement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub effect: Effect,
    pub actions: Vec<String>,
    pub resources: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub conditions: Conditions,
}

impl PolicyStatement {
    /// Allow `actions` on `resources`.
    #[must_use]
    pub fn allow(actions: &[&str], resources: &[&str]) -> Self {
        Self::new(Effect::Allow, actions, resources)
    }

    /// Deny `actions` on `resources`.
    #[must_use]
    pub fn deny(actions: &[&str], resources: &[&str]) -> Self {
        Self::new(Effect::Deny, actions, resources)
    }

    fn new(effect: Effect, actions: &[&str], resources: &[&str]) -> Self {
        Self {
            sid: None,
            effect,
            actions: actions.iter().map(|a| (*a).to_string()).collect(),
            resources: resources.iter().map(|r| (*r).to_string()).collect(),
            conditions: Conditions::new(),
        }
    }

    /// Attach a statement id.
    #[must_use]
    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    /// Add one condition `operator: { key: value }`.
    #[must_use]
    pub fn with_condition(mut self, operator: &str, key: &str, value: impl Into<String>) -> Self {
        self.conditions
            .entry(operator.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
        self
    }
}

/// An IAM role and its inline policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSpec {
    pub logical_id: String,
    pub role_name: String,
    pub arn: String,
    /// Service principals allowed to assume the role.
    pub assumed_by: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub trust_conditions: Conditions,
    pub statements: Vec<PolicyStatement>,
}

/// A customer-managed policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySpec {
    pub logical_id: String,
    pub policy_name: String,
    pub arn: String,
    pub statements: Vec<PolicyStatement>,
}

// =============================================================================
// CLOUDWATCH / SSM / LOGS / S3
// =============================================================================

/// A CloudWatch metric alarm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmSpec {
    pub logical_id: String,
    pub alarm_name: String,
    pub arn: String,
    pub namespace: String,
    pub metric_name: String,
    pub period_seconds: u32,
    pub threshold: i64,
    pub evaluation_periods: u32,
    pub datapoints_to_alarm: u32,
    pub comparison_operator: String,
    pub treat_missing_data: String,
}

/// An SSM document. The YAML body stays outside the graph; only its path is
/// recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSpec {
    pub logical_id: String,
    pub name: String,
    pub document_type: String,
    pub document_format: String,
    pub content_path: String,
}

/// A CloudWatch log group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogGroupSpec {
    pub logical_id: String,
    pub log_group_name: String,
    pub arn: String,
}

/// An S3 bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSpec {
    pub logical_id: String,
    pub bucket_name: String,
    pub arn: String,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_conditions_group_by_operator() {
        let stmt = PolicyStatement::allow(&["ec2:StopInstances"], &["*"])
            .with_condition("StringEquals", "aws:ResourceTag/FIS-Ready", "true")
            .with_condition("StringEquals", "aws:SourceAccount", "1");

        assert_eq!(stmt.conditions.len(), 1);
        assert_eq!(stmt.conditions["StringEquals"].len(), 2);
    }

    #[test]
    fn resource_serializes_with_kind_tag() {
        let resource = Resource::Bucket(BucketSpec {
            logical_id: "fisS3Bucket".to_string(),
            bucket_name: "fis-fislogs-fiss3bucket".to_string(),
            arn: "arn:aws:s3:::fis-fislogs-fiss3bucket".to_string(),
        });
        let json = serde_json::to_value(&resource).expect("serialize");
        assert_eq!(json["type"], "bucket");
        assert_eq!(json["logical_id"], "fisS3Bucket");
        assert_eq!(resource.kind(), "bucket");
    }

    #[test]
    fn empty_conditions_are_omitted() {
        let stmt = PolicyStatement::deny(&["s3:GetObject"], &["arn:aws:s3:::b"]);
        let json = serde_json::to_value(&stmt).expect("serialize");
        assert!(json.get("conditions").is_none());
        assert!(json.get("sid").is_none());
    }
}
