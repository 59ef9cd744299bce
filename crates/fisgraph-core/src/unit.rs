//! # Provisioning Units
//!
//! A unit is one independently deployable group of resources. It declares
//! its outputs, the units it depends on and the references it imports, and
//! carries the callback that materializes it.

use crate::registry::Registry;
use crate::resources::Resource;
use crate::{DeploymentContext, FisgraphError, OutputName, ResourceRef, UnitId};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// MATERIALIZATION
// =============================================================================

/// The materialization callback of a unit.
///
/// Implementations read imported values through the [`UnitContext`] and
/// return the unit's outputs and resources. They must not have side effects
/// outside the returned value.
pub trait Materialize: Send + Sync {
    fn materialize(&self, ctx: &UnitContext<'_>) -> Result<Materialized, FisgraphError>;
}

impl<F> Materialize for F
where
    F: Fn(&UnitContext<'_>) -> Result<Materialized, FisgraphError> + Send + Sync,
{
    fn materialize(&self, ctx: &UnitContext<'_>) -> Result<Materialized, FisgraphError> {
        self(ctx)
    }
}

/// What a unit produced: output values and resource records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Materialized {
    pub outputs: BTreeMap<OutputName, String>,
    pub resources: Vec<Resource>,
}

impl Materialized {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an output value.
    #[must_use]
    pub fn output(mut self, name: impl Into<OutputName>, value: impl Into<String>) -> Self {
        self.outputs.insert(name.into(), value.into());
        self
    }

    /// Add a resource record.
    #[must_use]
    pub fn resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }
}

/// Read-only view handed to a materializer.
pub struct UnitContext<'a> {
    unit: &'a ProvisioningUnit,
    registry: &'a Registry,
    deployment: &'a DeploymentContext,
}

impl<'a> UnitContext<'a> {
    /// Create a context for `unit`.
    #[must_use]
    pub fn new(
        unit: &'a ProvisioningUnit,
        registry: &'a Registry,
        deployment: &'a DeploymentContext,
    ) -> Self {
        Self {
            unit,
            registry,
            deployment,
        }
    }

    /// Id of the unit being materialized.
    #[must_use]
    pub fn unit_id(&self) -> &'a UnitId {
        &self.unit.id
    }

    /// The deployment context.
    #[must_use]
    pub fn deployment(&self) -> &'a DeploymentContext {
        self.deployment
    }

    /// Resolve a reference the unit declared as an import.
    pub fn import(&self, reference: &ResourceRef) -> Result<&'a str, FisgraphError> {
        if !self.unit.imports.contains(reference) {
            return Err(FisgraphError::UndeclaredReference {
                consumer: self.unit.id.clone(),
                reference: reference.clone(),
            });
        }
        self.registry.resolve(reference)
    }

    /// Resolve every declared import, keyed by output (export) name.
    pub fn resolved_imports(&self) -> Result<BTreeMap<String, String>, FisgraphError> {
        let mut resolved = BTreeMap::new();
        for reference in &self.unit.imports {
            let value = self.registry.resolve(reference)?;
            resolved.insert(reference.output.as_str().to_string(), value.to_string());
        }
        Ok(resolved)
    }
}

// =============================================================================
// PROVISIONING UNIT
// =============================================================================

/// A declared output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDecl {
    pub name: OutputName,
    pub description: String,
}

/// One node of the dependency graph.
pub struct ProvisioningUnit {
    id: UnitId,
    outputs: Vec<OutputDecl>,
    depends_on: Vec<UnitId>,
    imports: Vec<ResourceRef>,
    materializer: Box<dyn Materialize>,
}

impl fmt::Debug for ProvisioningUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisioningUnit")
            .field("id", &self.id)
            .field("outputs", &self.outputs)
            .field("depends_on", &self.depends_on)
            .field("imports", &self.imports)
            .finish_non_exhaustive()
    }
}

impl ProvisioningUnit {
    /// Create a unit with no outputs, dependencies or imports.
    pub fn new(id: impl Into<UnitId>, materializer: impl Materialize + 'static) -> Self {
        Self {
            id: id.into(),
            outputs: Vec::new(),
            depends_on: Vec::new(),
            imports: Vec::new(),
            materializer: Box::new(materializer),
        }
    }

    /// Declare an output.
    #[must_use]
    pub fn output(mut self, name: impl Into<OutputName>, description: impl Into<String>) -> Self {
        self.outputs.push(OutputDecl {
            name: name.into(),
            description: description.into(),
        });
        self
    }

    /// Declare a dependency. Repeated declarations are kept once.
    #[must_use]
    pub fn depends_on(mut self, unit: impl Into<UnitId>) -> Self {
        let unit = unit.into();
        if !self.depends_on.contains(&unit) {
            self.depends_on.push(unit);
        }
        self
    }

    /// Declare an imported reference. Repeated declarations are kept once.
    #[must_use]
    pub fn imports(mut self, reference: ResourceRef) -> Self {
        if !self.imports.contains(&reference) {
            self.imports.push(reference);
        }
        self
    }

    #[must_use]
    pub fn id(&self) -> &UnitId {
        &self.id
    }

    #[must_use]
    pub fn declared_outputs(&self) -> &[OutputDecl] {
        &self.outputs
    }

    #[must_use]
    pub fn dependencies(&self) -> &[UnitId] {
        &self.depends_on
    }

    #[must_use]
    pub fn declared_imports(&self) -> &[ResourceRef] {
        &self.imports
    }

    /// Whether the unit declares an output with this name.
    #[must_use]
    pub fn declares_output(&self, name: &OutputName) -> bool {
        self.outputs.iter().any(|o| &o.name == name)
    }

    /// Run the materialization callback.
    pub fn materialize(&self, ctx: &UnitContext<'_>) -> Result<Materialized, FisgraphError> {
        self.materializer.materialize(ctx)
    }
}

// =============================================================================
// TESTS
// =============================================================================
