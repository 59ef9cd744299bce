//! # Experiment Templates
//!
//! Normalized experiment-template records and the rules they obey.
//!
//! Recipes in the catalog produce a [`TemplateDraft`] whose selection modes
//! are still raw strings. [`finalize`] checks every rule at once and either
//! returns the typed [`ExperimentTemplate`] or an `InvalidTemplate` error that
//! lists all violations.

pub mod assembler;
pub mod zone;

pub use assembler::{FaultParams, TemplateAssembler};
pub use zone::{pick_zone, FixedZone, SeededZones, ThreadRngZones, ZoneSource};

use crate::primitives::MAX_SELECTION_PERCENT;
use crate::FisgraphError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// SELECTION MODE
// =============================================================================

/// How many of the matching resources a target selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SelectionMode {
    All,
    Count(u32),
    Percent(u32),
}

impl FromStr for SelectionMode {
    type Err = String;

    /// Parse `ALL`, `COUNT(n)` with `n > 0`, or `PERCENT(n)` with `1 <= n <= 100`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "ALL" {
            return Ok(Self::All);
        }
        if let Some(n) = bracketed(s, "COUNT") {
            let n = parse_number(n)?;
            if n == 0 {
                return Err("COUNT must be positive".to_string());
            }
            return Ok(Self::Count(n));
        }
        if let Some(n) = bracketed(s, "PERCENT") {
            let n = parse_number(n)?;
            if n == 0 || n > MAX_SELECTION_PERCENT {
                return Err(format!("PERCENT must be within 1..={}", MAX_SELECTION_PERCENT));
            }
            return Ok(Self::Percent(n));
        }
        Err("expected ALL, COUNT(n) or PERCENT(n)".to_string())
    }
}

fn bracketed<'a>(s: &'a str, keyword: &str) -> Option<&'a str> {
    s.strip_prefix(keyword)?.strip_prefix('(')?.strip_suffix(')')
}

fn parse_number(s: &str) -> Result<u32, String> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("`{}` is not a number", s));
    }
    s.parse::<u32>()
        .map_err(|_| format!("`{}` is out of range", s))
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("ALL"),
            Self::Count(n) => write!(f, "COUNT({})", n),
            Self::Percent(n) => write!(f, "PERCENT({})", n),
        }
    }
}

impl TryFrom<String> for SelectionMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SelectionMode> for String {
    fn from(mode: SelectionMode) -> Self {
        mode.to_string()
    }
}

// =============================================================================
// TEMPLATE RECORDS
// =============================================================================

/// Attribute filter: the resource attribute at `path` must take one of `values`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeFilter {
    pub path: String,
    pub values: Vec<String>,
}

impl AttributeFilter {
    #[must_use]
    pub fn new(path: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            path: path.into(),
            values,
        }
    }
}

/// A validated target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSpec {
    pub resource_type: String,
    pub selection_mode: SelectionMode,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resource_tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_arns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<AttributeFilter>,
}

/// A target whose selection mode has not been parsed yet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TargetDraft {
    pub resource_type: String,
    pub selection_mode: String,
    pub resource_tags: BTreeMap<String, String>,
    pub resource_arns: Vec<String>,
    pub filters: Vec<AttributeFilter>,
}

impl TargetDraft {
    #[must_use]
    pub fn new(resource_type: impl Into<String>, selection_mode: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            selection_mode: selection_mode.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.resource_tags.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn arn(mut self, arn: impl Into<String>) -> Self {
        self.resource_arns.push(arn.into());
        self
    }

    #[must_use]
    pub fn filter(mut self, path: impl Into<String>, values: Vec<String>) -> Self {
        self.filters.push(AttributeFilter::new(path, values));
        self
    }
}

/// One action of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSpec {
    pub action_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    /// Target role (`Instances`, `Roles`, ...) -> key in the targets map.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub targets: BTreeMap<String, String>,
}

impl ActionSpec {
    #[must_use]
    pub fn new(action_id: impl Into<String>) -> Self {
        Self {
            action_id: action_id.into(),
            description: None,
            parameters: BTreeMap::new(),
            targets: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Bind target role `role` to the targets-map key `target`.
    #[must_use]
    pub fn target(mut self, role: impl Into<String>, target: impl Into<String>) -> Self {
        self.targets.insert(role.into(), target.into());
        self
    }
}

/// Guard that halts a running experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopCondition {
    pub source: String,
    pub value: String,
}

/// A validated experiment template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentTemplate {
    pub logical_id: String,
    pub description: String,
    pub role_arn: String,
    pub stop_conditions: Vec<StopCondition>,
    pub tags: BTreeMap<String, String>,
    pub actions: BTreeMap<String, ActionSpec>,
    pub targets: BTreeMap<String, TargetSpec>,
}

/// A template before validation.
///
/// Recipes record problems they hit while drafting (a missing parameter, no
/// zone to pick) in `violations` and keep going, so [`finalize`] can report
/// everything at once.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TemplateDraft {
    pub logical_id: String,
    pub description: String,
    pub role_arn: String,
    pub stop_conditions: Vec<StopCondition>,
    pub tags: BTreeMap<String, String>,
    pub actions: BTreeMap<String, ActionSpec>,
    pub targets: BTreeMap<String, TargetDraft>,
    pub violations: Vec<Violation>,
}

// =============================================================================
// VIOLATIONS
// =============================================================================

/// One broken template rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// An action binds a target key that is not in the targets map.
    MissingTarget { action: String, target: String },
    InvalidSelectionMode {
        target: String,
        mode: String,
        reason: String,
    },
    EmptyFilterPath { target: String },
    EmptyFilterValues { target: String, path: String },
    MissingParameter(String),
    MissingImport(String),
    EmptyRoleArn,
    /// Stop condition at this position has an empty source or value.
    InvalidStopCondition { index: usize },
    NoActions,
    EmptyResourceType { target: String },
    NoAvailabilityZones,
    ZoneIndexOutOfRange { index: usize, len: usize },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTarget { action, target } => {
                write!(f, "action `{}` references missing target `{}`", action, target)
            }
            Self::InvalidSelectionMode {
                target,
                mode,
                reason,
            } => write!(
                f,
                "target `{}` has invalid selection mode `{}`: {}",
                target, mode, reason
            ),
            Self::EmptyFilterPath { target } => {
                write!(f, "target `{}` has a filter with an empty path", target)
            }
            Self::EmptyFilterValues { target, path } => write!(
                f,
                "target `{}` filter `{}` has no allowed values",
                target, path
            ),
            Self::MissingParameter(key) => write!(f, "missing context parameter `{}`", key),
            Self::MissingImport(name) => write!(f, "missing import `{}`", name),
            Self::EmptyRoleArn => f.write_str("role ARN is empty"),
            Self::InvalidStopCondition { index } => {
                write!(f, "stop condition #{} has an empty source or value", index)
            }
            Self::NoActions => f.write_str("template has no actions"),
            Self::EmptyResourceType { target } => {
                write!(f, "target `{}` has an empty resource type", target)
            }
            Self::NoAvailabilityZones => f.write_str("no availability zones to choose from"),
            Self::ZoneIndexOutOfRange { index, len } => write!(
                f,
                "zone index {} is out of range for {} zones",
                index, len
            ),
        }
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Validate a draft and convert it into a template.
///
/// Every rule is checked; the error carries all violations in a stable
/// order (drafting problems first, then role, stop conditions, actions,
/// targets).
pub fn finalize(draft: TemplateDraft) -> Result<ExperimentTemplate, FisgraphError> {
    let TemplateDraft {
        logical_id,
        description,
        role_arn,
        stop_conditions,
        tags,
        actions,
        targets: target_drafts,
        mut violations,
    } = draft;

    if role_arn.trim().is_empty() {
        violations.push(Violation::EmptyRoleArn);
    }

    for (index, condition) in stop_conditions.iter().enumerate() {
        if condition.source.trim().is_empty() || condition.value.trim().is_empty() {
            violations.push(Violation::InvalidStopCondition { index });
        }
    }

    if actions.is_empty() {
        violations.push(Violation::NoActions);
    }
    for (name, action) in &actions {
        for target in action.targets.values() {
            if !target_drafts.contains_key(target) {
                violations.push(Violation::MissingTarget {
                    action: name.clone(),
                    target: target.clone(),
                });
            }
        }
    }

    let mut targets = BTreeMap::new();
    for (name, target) in target_drafts {
        if target.resource_type.trim().is_empty() {
            violations.push(Violation::EmptyResourceType {
                target: name.clone(),
            });
        }
        for filter in &target.filters {
            if filter.path.trim().is_empty() {
                violations.push(Violation::EmptyFilterPath {
                    target: name.clone(),
                });
            }
            if filter.values.iter().all(|v| v.trim().is_empty()) {
                violations.push(Violation::EmptyFilterValues {
                    target: name.clone(),
                    path: filter.path.clone(),
                });
            }
        }
        match target.selection_mode.parse::<SelectionMode>() {
            Ok(selection_mode) => {
                targets.insert(
                    name,
                    TargetSpec {
                        resource_type: target.resource_type,
                        selection_mode,
                        resource_tags: target.resource_tags,
                        resource_arns: target.resource_arns,
                        filters: target.filters,
                    },
                );
            }
            Err(reason) => violations.push(Violation::InvalidSelectionMode {
                target: name,
                mode: target.selection_mode,
                reason,
            }),
        }
    }

    if !violations.is_empty() {
        return Err(FisgraphError::InvalidTemplate {
            template: logical_id,
            violations,
        });
    }

    Ok(ExperimentTemplate {
        logical_id,
        description,
        role_arn,
        stop_conditions,
        tags,
        actions,
        targets,
    })
}

// =============================================================================
// TESTS
// =============================================================================
