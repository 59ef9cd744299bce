//! # Stack Orchestrator
//!
//! Materializes the units of a [`DeploymentPlan`] strictly in plan order.
//!
//! Each unit sees a read-only registry holding everything published by the
//! units before it. Its outputs are checked against its declarations and
//! published before the next unit runs. The first failure halts the run; no
//! rollback is attempted.

use crate::graph::DeploymentPlan;
use crate::registry::Registry;
use crate::resources::Resource;
use crate::template::ExperimentTemplate;
use crate::unit::{Materialized, ProvisioningUnit, UnitContext};
use crate::{DeploymentContext, FisgraphError, OutputName, ResourceRef, UnitId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// REPORT
// =============================================================================

/// What one unit produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitReport {
    pub unit: UnitId,
    pub depends_on: Vec<UnitId>,
    pub outputs: BTreeMap<OutputName, String>,
    pub resources: Vec<Resource>,
}

/// Outcome of a deployment run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentReport {
    /// Materialized units, in deployment order.
    pub materialized: Vec<UnitReport>,
    /// Units left out of a selective run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<UnitId>,
}

impl DeploymentReport {
    /// Ids of the materialized units, in order.
    #[must_use]
    pub fn completed(&self) -> Vec<UnitId> {
        self.materialized.iter().map(|r| r.unit.clone()).collect()
    }

    /// Every experiment template produced by the run.
    pub fn templates(&self) -> impl Iterator<Item = &ExperimentTemplate> {
        self.materialized
            .iter()
            .flat_map(|r| r.resources.iter())
            .filter_map(Resource::as_template)
    }
}

// =============================================================================
// ORCHESTRATOR
// =============================================================================

/// Sequential deployer for one deployment context.
#[derive(Debug, Clone, Copy)]
pub struct StackOrchestrator<'a> {
    context: &'a DeploymentContext,
}

impl<'a> StackOrchestrator<'a> {
    #[must_use]
    pub fn new(context: &'a DeploymentContext) -> Self {
        Self { context }
    }

    /// Materialize every unit of the plan.
    pub fn deploy(
        &self,
        plan: &DeploymentPlan,
        registry: &mut Registry,
    ) -> Result<DeploymentReport, FisgraphError> {
        self.run(plan, registry, |_| true)
    }

    /// Materialize only the selected units, in plan order.
    ///
    /// Skipped units must already have their exports in `registry`, typically
    /// reloaded from the export store; a selected unit that imports a missing
    /// export fails with `UnresolvedReference`.
    pub fn deploy_selected(
        &self,
        plan: &DeploymentPlan,
        registry: &mut Registry,
        selection: &BTreeSet<UnitId>,
    ) -> Result<DeploymentReport, FisgraphError> {
        if let Some(unknown) = selection.iter().find(|id| plan.get(id).is_none()) {
            return Err(FisgraphError::UnknownUnit(unknown.clone()));
        }
        self.run(plan, registry, |id| selection.contains(id))
    }

    fn run(
        &self,
        plan: &DeploymentPlan,
        registry: &mut Registry,
        selected: impl Fn(&UnitId) -> bool,
    ) -> Result<DeploymentReport, FisgraphError> {
        let mut report = DeploymentReport::default();

        for unit in plan.units() {
            let id = unit.id();
            if !selected(id) {
                tracing::info!(unit = %id, "unit skipped");
                report.skipped.push(id.clone());
                continue;
            }

            tracing::info!(unit = %id, "materializing unit");
            let produced = self
                .materialize_unit(unit, registry)
                .and_then(|produced| publish(id, &produced, registry).map(|()| produced));

            let produced = match produced {
                Ok(produced) => produced,
                Err(cause) => {
                    let completed = report.completed();
                    tracing::error!(
                        unit = %id,
                        completed = completed.len(),
                        error = %cause,
                        "materialization failed, halting deployment"
                    );
                    return Err(FisgraphError::MaterializationFailure {
                        unit: id.clone(),
                        completed,
                        cause: Box::new(cause),
                    });
                }
            };

            tracing::info!(
                unit = %id,
                outputs = produced.outputs.len(),
                resources = produced.resources.len(),
                "unit materialized"
            );
            report.materialized.push(UnitReport {
                unit: id.clone(),
                depends_on: unit.dependencies().to_vec(),
                outputs: produced.outputs,
                resources: produced.resources,
            });
        }

        Ok(report)
    }

    fn materialize_unit(
        &self,
        unit: &ProvisioningUnit,
        registry: &Registry,
    ) -> Result<Materialized, FisgraphError> {
        let ctx = UnitContext::new(unit, registry, self.context);
        let produced = unit.materialize(&ctx)?;
        check_outputs(unit, &produced)?;
        Ok(produced)
    }
}

/// The produced outputs must match the declared ones exactly.
fn check_outputs(unit: &ProvisioningUnit, produced: &Materialized) -> Result<(), FisgraphError> {
    if let Some(extra) = produced
        .outputs
        .keys()
        .find(|name| !unit.declares_output(name))
    {
        return Err(FisgraphError::UndeclaredOutput {
            unit: unit.id().clone(),
            output: extra.clone(),
        });
    }
    if let Some(missing) = unit
        .declared_outputs()
        .iter()
        .find(|decl| !produced.outputs.contains_key(&decl.name))
    {
        return Err(FisgraphError::MissingOutput {
            unit: unit.id().clone(),
            output: missing.name.clone(),
        });
    }
    Ok(())
}

/// Publish all outputs of a unit, or none of them.
fn publish(id: &UnitId, produced: &Materialized, registry: &mut Registry) -> Result<(), FisgraphError> {
    if let Some(taken) = produced
        .outputs
        .keys()
        .map(|name| ResourceRef::new(id.clone(), name.clone()))
        .find(|key| registry.contains(key))
    {
        return Err(FisgraphError::DuplicateKey(taken));
    }
    for (name, value) in &produced.outputs {
        registry.publish(id.clone(), name.clone(), value.clone())?;
        tracing::debug!(unit = %id, output = %name, "output published");
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
