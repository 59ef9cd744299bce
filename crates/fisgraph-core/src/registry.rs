//! # Resource Registry
//!
//! Write-once store of the values units publish for each other.
//!
//! - `publish` fails with `DuplicateKey` on a second write to the same key
//! - `resolve` fails with `UnresolvedReference` until the key is published
//! - There is no removal; entries live for the whole deployment run

use crate::{FisgraphError, OutputName, ResourceRef, UnitId};
use std::collections::BTreeMap;

/// The registry of published outputs, keyed by `(unit, output)`.
///
/// Uses `BTreeMap` so iteration is ordered by unit, then output name.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: BTreeMap<ResourceRef, String>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a value under `(unit, name)`.
    pub fn publish(
        &mut self,
        unit: impl Into<UnitId>,
        name: impl Into<OutputName>,
        value: impl Into<String>,
    ) -> Result<(), FisgraphError> {
        let key = ResourceRef::new(unit, name);
        if self.entries.contains_key(&key) {
            return Err(FisgraphError::DuplicateKey(key));
        }
        self.entries.insert(key, value.into());
        Ok(())
    }

    /// Resolve a reference to the value published under it.
    pub fn resolve(&self, reference: &ResourceRef) -> Result<&str, FisgraphError> {
        self.entries
            .get(reference)
            .map(String::as_str)
            .ok_or_else(|| FisgraphError::UnresolvedReference(reference.clone()))
    }

    /// Check whether a reference has been published.
    #[must_use]
    pub fn contains(&self, reference: &ResourceRef) -> bool {
        self.entries.contains_key(reference)
    }

    /// Number of published entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been published yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in deterministic order.
    pub fn entries(&self) -> impl Iterator<Item = (&ResourceRef, &str)> {
        self.entries.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// Entries published by a single unit.
    pub fn entries_for<'a>(
        &'a self,
        unit: &'a UnitId,
    ) -> impl Iterator<Item = (&'a OutputName, &'a str)> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| &k.unit == unit)
            .map(|(k, v)| (&k.output, v.as_str()))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_then_resolve_returns_value() {
        let mut registry = Registry::new();
        registry
            .publish("FisRole", "FISIamRoleArn", "arn:aws:iam::1:role/fis")
            .expect("publish");

        let value = registry
            .resolve(&ResourceRef::new("FisRole", "FISIamRoleArn"))
            .expect("resolve");
        assert_eq!(value, "arn:aws:iam::1:role/fis");
    }

    #[test]
    fn second_publish_fails_with_duplicate_key() {
        let mut registry = Registry::new();
        registry.publish("A", "out", "1").expect("publish");

        let result = registry.publish("A", "out", "2");
        assert!(matches!(result, Err(FisgraphError::DuplicateKey(ref r)) if r.to_string() == "A/out"));

        // first value is kept
        assert_eq!(
            registry.resolve(&ResourceRef::new("A", "out")).expect("resolve"),
            "1"
        );
    }

    #[test]
    fn resolve_before_publish_fails() {
        let registry = Registry::new();
        let result = registry.resolve(&ResourceRef::new("StopCond", "StopConditionArn"));
        assert!(matches!(result, Err(FisgraphError::UnresolvedReference(_))));
    }

    #[test]
    fn same_name_in_different_units_is_not_a_duplicate() {
        let mut registry = Registry::new();
        registry.publish("A", "Arn", "a").expect("publish");
        registry.publish("B", "Arn", "b").expect("publish");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn entries_for_filters_by_unit() {
        let mut registry = Registry::new();
        registry.publish("A", "x", "1").expect("publish");
        registry.publish("B", "y", "2").expect("publish");
        registry.publish("A", "z", "3").expect("publish");

        let unit = UnitId::new("A");
        let names: Vec<_> = registry
            .entries_for(&unit)
            .map(|(n, _)| n.as_str().to_string())
            .collect();
        assert_eq!(names, vec!["x", "z"]);
    }
}
