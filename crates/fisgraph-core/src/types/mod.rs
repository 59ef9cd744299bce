//! # Core Type Definitions
//!
//! This module contains the identifiers and the error type shared by every
//! part of the graph builder:
//! - Unit and output identifiers (`UnitId`, `OutputName`)
//! - Cross-unit references (`ResourceRef`)
//! - Error types (`FisgraphError`)
//!
//! ## Determinism Guarantees
//!
//! All identifier types implement `Ord` so they can key `BTreeMap`/`BTreeSet`
//! collections, which keeps every iteration order stable across runs.

use crate::template::Violation;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of a provisioning unit (one independently deployable stack).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub String);

impl UnitId {
    /// Create a new unit identifier.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Name of an output declared by a unit (the export name).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputName(pub String);

impl OutputName {
    /// Create a new output name.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OutputName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OutputName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// =============================================================================
// RESOURCE REFERENCE
// =============================================================================

/// A `(producer unit, output name)` pair, resolved lazily at deploy time.
///
/// A reference is only valid when the producer is an ancestor of the unit
/// that consumes it and declares the named output.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    /// The unit that publishes the value.
    pub unit: UnitId,
    /// The output name within that unit.
    pub output: OutputName,
}

impl ResourceRef {
    /// Create a new reference.
    #[must_use]
    pub fn new(unit: impl Into<UnitId>, output: impl Into<OutputName>) -> Self {
        Self {
            unit: unit.into(),
            output: output.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.unit, self.output)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur while building, validating or deploying the graph.
///
/// - No silent failures
/// - Use `Result<T, FisgraphError>` for fallible operations
/// - The core never panics; structural errors surface to the caller at once
#[derive(Debug, Error)]
pub enum FisgraphError {
    /// A value was already published under this reference.
    #[error("Duplicate key: {0}")]
    DuplicateKey(ResourceRef),

    /// The reference has not been published yet.
    #[error("Unresolved reference: {0}")]
    UnresolvedReference(ResourceRef),

    /// The dependency relation contains a cycle (path ends where it started).
    #[error("Cyclic dependency: {}", join_units(.0, " -> "))]
    CyclicDependency(Vec<UnitId>),

    /// Template assembly found one or more violated invariants.
    #[error("Invalid template `{template}`: {}", join_violations(.violations))]
    InvalidTemplate {
        template: String,
        violations: Vec<Violation>,
    },

    /// A unit failed to materialize; deployment halted.
    #[error(
        "Materialization of unit `{unit}` failed after [{}]: {cause}",
        join_units(.completed, ", ")
    )]
    MaterializationFailure {
        unit: UnitId,
        completed: Vec<UnitId>,
        #[source]
        cause: Box<FisgraphError>,
    },

    /// A unit with this id is already registered.
    #[error("Duplicate unit: {0}")]
    DuplicateUnit(UnitId),

    /// A unit depends on an id that was never registered.
    #[error("Unit `{unit}` depends on unknown unit `{missing}`")]
    UnknownDependency { unit: UnitId, missing: UnitId },

    /// The requested unit is not part of the graph.
    #[error("Unknown unit: {0}")]
    UnknownUnit(UnitId),

    /// A unit reads a reference it did not declare, or whose producer is
    /// not one of its ancestors.
    #[error("Unit `{consumer}` uses undeclared reference {reference}")]
    UndeclaredReference {
        consumer: UnitId,
        reference: ResourceRef,
    },

    /// A unit produced an output it never declared.
    #[error("Unit `{unit}` produced undeclared output `{output}`")]
    UndeclaredOutput { unit: UnitId, output: OutputName },

    /// A unit finished without producing one of its declared outputs.
    #[error("Unit `{unit}` did not produce declared output `{output}`")]
    MissingOutput { unit: UnitId, output: OutputName },

    /// The fault kind name is not part of the catalog.
    #[error("Unknown fault kind: {0}")]
    UnknownFaultKind(String),

    /// A required context parameter is absent or empty.
    #[error("Missing context parameter: {0}")]
    MissingParameter(String),

    /// The deployment context is malformed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

fn join_units(units: &[UnitId], sep: &str) -> String {
    units
        .iter()
        .map(UnitId::as_str)
        .collect::<Vec<_>>()
        .join(sep)
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_ref_display() {
        let r = ResourceRef::new("FisRole", "FISIamRoleArn");
        assert_eq!(r.to_string(), "FisRole/FISIamRoleArn");
    }

    #[test]
    fn resource_refs_order_by_unit_then_output() {
        let a = ResourceRef::new("A", "z");
        let b = ResourceRef::new("B", "a");
        let a2 = ResourceRef::new("A", "b");
        let mut refs = vec![b.clone(), a.clone(), a2.clone()];
        refs.sort();
        assert_eq!(refs, vec![a2, a, b]);
    }

    #[test]
    fn cycle_error_lists_path() {
        let err = FisgraphError::CyclicDependency(vec![
            UnitId::new("A"),
            UnitId::new("B"),
            UnitId::new("A"),
        ]);
        assert_eq!(err.to_string(), "Cyclic dependency: A -> B -> A");
    }

    #[test]
    fn materialization_failure_reports_completed_units() {
        let err = FisgraphError::MaterializationFailure {
            unit: UnitId::new("C"),
            completed: vec![UnitId::new("A"), UnitId::new("B")],
            cause: Box::new(FisgraphError::MissingParameter("vpc_id".to_string())),
        };
        let msg = err.to_string();
        assert!(msg.contains("`C`"));
        assert!(msg.contains("[A, B]"));
        assert!(msg.contains("vpc_id"));
    }

    #[test]
    fn unit_id_serializes_transparently() {
        let json = serde_json::to_string(&UnitId::new("FisLogs")).expect("serialize");
        assert_eq!(json, "\"FisLogs\"");
    }
}
