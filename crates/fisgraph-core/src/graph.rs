//! # Dependency Graph Builder
//!
//! The directed graph of provisioning units.
//!
//! Units keep their insertion order; every lookup goes through a `BTreeMap`
//! index, so two builds of the same graph always produce the same order.
//! Cycle detection is a depth-first traversal with a three-color marker;
//! ordering is a Kahn pass that always releases the earliest-inserted ready
//! unit first.

use crate::primitives::{MAX_UNITS, MAX_UNIT_ID_LENGTH};
use crate::unit::ProvisioningUnit;
use crate::{FisgraphError, UnitId};
use std::collections::{BTreeMap, BTreeSet};

/// Traversal marker for cycle detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

// =============================================================================
// DEPENDENCY GRAPH
// =============================================================================

/// Graph of provisioning units under construction.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Units in insertion order.
    units: Vec<ProvisioningUnit>,
    /// Reverse lookup: UnitId -> position in `units`.
    index: BTreeMap<UnitId, usize>,
}

impl DependencyGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit together with its declared dependencies.
    ///
    /// Dependencies may name units that are added later; they are checked by
    /// [`DependencyGraph::build`].
    pub fn add_unit(&mut self, unit: ProvisioningUnit) -> Result<(), FisgraphError> {
        let id = unit.id().clone();
        if id.as_str().is_empty() || id.as_str().len() > MAX_UNIT_ID_LENGTH {
            return Err(FisgraphError::InvalidConfig(format!(
                "unit id must be 1..={} characters, got {}",
                MAX_UNIT_ID_LENGTH,
                id.as_str().len()
            )));
        }
        if self.index.contains_key(&id) {
            return Err(FisgraphError::DuplicateUnit(id));
        }
        if self.units.len() >= MAX_UNITS {
            return Err(FisgraphError::InvalidConfig(format!(
                "graph exceeds {} units",
                MAX_UNITS
            )));
        }
        self.index.insert(id, self.units.len());
        self.units.push(unit);
        Ok(())
    }

    /// Number of registered units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether no unit is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Look up a unit by id.
    #[must_use]
    pub fn get(&self, id: &UnitId) -> Option<&ProvisioningUnit> {
        self.index.get(id).map(|&i| &self.units[i])
    }

    /// Units in insertion order.
    pub fn units(&self) -> impl Iterator<Item = &ProvisioningUnit> {
        self.units.iter()
    }

    /// Compute the deployment order.
    ///
    /// Every unit appears after all of its dependencies. Units whose
    /// dependencies are all satisfied are released in insertion order.
    pub fn build(&self) -> Result<Vec<UnitId>, FisgraphError> {
        self.check_dependencies()?;
        let deps = self.dependency_indices();
        Self::detect_cycle(&deps, &self.units)?;

        let mut remaining: Vec<usize> = deps.iter().map(Vec::len).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.units.len()];
        for (unit, unit_deps) in deps.iter().enumerate() {
            for &dep in unit_deps {
                dependents[dep].push(unit);
            }
        }

        let mut ready: BTreeSet<usize> = remaining
            .iter()
            .enumerate()
            .filter(|(_, count)| **count == 0)
            .map(|(i, _)| i)
            .collect();
        let mut order = Vec::with_capacity(self.units.len());

        while let Some(next) = ready.pop_first() {
            order.push(self.units[next].id().clone());
            for &dependent in &dependents[next] {
                remaining[dependent] = remaining[dependent].saturating_sub(1);
                if remaining[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        // Unreachable once detect_cycle passed, kept as a hard guarantee.
        if order.len() != self.units.len() {
            return Err(FisgraphError::CyclicDependency(
                self.units
                    .iter()
                    .map(|u| u.id().clone())
                    .filter(|id| !order.contains(id))
                    .collect(),
            ));
        }

        Ok(order)
    }

    /// Transitive dependency closure of a unit.
    pub fn ancestors(&self, id: &UnitId) -> Result<BTreeSet<UnitId>, FisgraphError> {
        let start = self
            .get(id)
            .ok_or_else(|| FisgraphError::UnknownUnit(id.clone()))?;

        let mut seen = BTreeSet::new();
        let mut stack: Vec<&UnitId> = start.dependencies().iter().collect();
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(unit) = self.get(current) {
                stack.extend(unit.dependencies().iter());
            }
        }
        Ok(seen)
    }

    /// Check that every import names an ancestor that declares the output.
    pub fn validate_references(&self) -> Result<(), FisgraphError> {
        self.check_dependencies()?;
        for unit in &self.units {
            let ancestors = self.ancestors(unit.id())?;
            for reference in unit.declared_imports() {
                let produced = self
                    .get(&reference.unit)
                    .is_some_and(|producer| producer.declares_output(&reference.output));
                if !produced || !ancestors.contains(&reference.unit) {
                    return Err(FisgraphError::UndeclaredReference {
                        consumer: unit.id().clone(),
                        reference: reference.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Validate the graph and turn it into an ordered deployment plan.
    pub fn into_plan(self) -> Result<DeploymentPlan, FisgraphError> {
        let order = self.build()?;
        self.validate_references()?;

        let mut slots: Vec<Option<ProvisioningUnit>> = self.units.into_iter().map(Some).collect();
        let mut units = Vec::with_capacity(order.len());
        for id in &order {
            let unit = self
                .index
                .get(id)
                .and_then(|&i| slots[i].take())
                .ok_or_else(|| FisgraphError::UnknownUnit(id.clone()))?;
            units.push(unit);
        }
        Ok(DeploymentPlan { units })
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn check_dependencies(&self) -> Result<(), FisgraphError> {
        for unit in &self.units {
            for dep in unit.dependencies() {
                if !self.index.contains_key(dep) {
                    return Err(FisgraphError::UnknownDependency {
                        unit: unit.id().clone(),
                        missing: dep.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Dependency lists as positions into `units`, in declaration order.
    fn dependency_indices(&self) -> Vec<Vec<usize>> {
        self.units
            .iter()
            .map(|unit| {
                unit.dependencies()
                    .iter()
                    .filter_map(|dep| self.index.get(dep).copied())
                    .collect()
            })
            .collect()
    }

    /// Iterative three-color depth-first search.
    ///
    /// The explicit stack is the current path; meeting an in-progress unit
    /// closes a cycle, which is reported from that unit back to itself.
    fn detect_cycle(deps: &[Vec<usize>], units: &[ProvisioningUnit]) -> Result<(), FisgraphError> {
        let mut marks = vec![Mark::Unvisited; deps.len()];

        for root in 0..deps.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            marks[root] = Mark::InProgress;
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];

            while let Some(frame) = stack.last_mut() {
                let (node, pos) = *frame;
                if pos < deps[node].len() {
                    frame.1 += 1;
                    let child = deps[node][pos];
                    match marks[child] {
                        Mark::Unvisited => {
                            marks[child] = Mark::InProgress;
                            stack.push((child, 0));
                        }
                        Mark::InProgress => {
                            let start = stack.iter().position(|(n, _)| *n == child).unwrap_or(0);
                            let mut cycle: Vec<UnitId> = stack[start..]
                                .iter()
                                .map(|(n, _)| units[*n].id().clone())
                                .collect();
                            cycle.push(units[child].id().clone());
                            return Err(FisgraphError::CyclicDependency(cycle));
                        }
                        Mark::Done => {}
                    }
                } else {
                    marks[node] = Mark::Done;
                    stack.pop();
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// DEPLOYMENT PLAN
// =============================================================================

/// Units in validated deployment order.
#[derive(Debug)]
pub struct DeploymentPlan {
    units: Vec<ProvisioningUnit>,
}

impl DeploymentPlan {
    /// Unit ids in order.
    pub fn order(&self) -> Vec<&UnitId> {
        self.units.iter().map(ProvisioningUnit::id).collect()
    }

    /// Units in order.
    #[must_use]
    pub fn units(&self) -> &[ProvisioningUnit] {
        &self.units
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Look up a unit by id.
    #[must_use]
    pub fn get(&self, id: &UnitId) -> Option<&ProvisioningUnit> {
        self.units.iter().find(|u| u.id() == id)
    }
}

// =============================================================================
// TESTS
// =============================================================================
