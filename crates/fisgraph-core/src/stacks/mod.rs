//! # FIS Application
//!
//! The concrete provisioning units and how they are wired.
//!
//! ```text
//! FisSsmDocs ─────────────────────────┐
//! FisLogs ──▶ FisRole ──┬──▶ experiment suites
//! StopCond ─────────────┘
//! ```
//!
//! `FisLogs`, `FisRole` and `StopCond` are always present. `FisSsmDocs` is
//! added only when a chosen suite imports from it. Experiment suites can be
//! narrowed to a selection; an empty selection means every suite.

pub mod experiments;
pub mod logs;
pub mod role;
pub mod ssm;
pub mod stop_condition;

pub use experiments::ExperimentSuite;

use crate::catalog::FaultKind;
use crate::graph::DependencyGraph;
use crate::primitives::*;
use crate::template::TemplateAssembler;
use crate::{FisgraphError, UnitId};

/// Every experiment suite, in insertion order.
pub const EXPERIMENT_SUITES: [&str; 8] = [
    UNIT_EC2_INSTANCES,
    UNIT_EC2_CONTROL_PLANE,
    UNIT_NACL,
    UNIT_ASG,
    UNIT_EKS,
    UNIT_SECURITY_GROUP,
    UNIT_IAM_ACCESS,
    UNIT_LAMBDA,
];

/// Build the FIS application graph.
///
/// Fails with `UnknownUnit` if `suites` names something that is not an
/// experiment suite.
pub fn fis_application(
    assembler: &TemplateAssembler,
    suites: &[String],
) -> Result<DependencyGraph, FisgraphError> {
    if let Some(unknown) = suites
        .iter()
        .find(|s| !EXPERIMENT_SUITES.contains(&s.as_str()))
    {
        return Err(FisgraphError::UnknownUnit(UnitId::new(unknown.as_str())));
    }

    let chosen: Vec<&'static str> = EXPERIMENT_SUITES
        .into_iter()
        .filter(|suite| suites.is_empty() || suites.iter().any(|s| s == suite))
        .collect();
    let needs_documents = chosen.iter().any(|suite| {
        FaultKind::in_suite(suite)
            .flat_map(FaultKind::required_imports)
            .any(|r| r.unit.as_str() == UNIT_SSM_DOCS)
    });

    let mut graph = DependencyGraph::new();
    if needs_documents {
        graph.add_unit(ssm::unit())?;
    }
    graph.add_unit(logs::unit())?;
    graph.add_unit(role::unit())?;
    graph.add_unit(stop_condition::unit())?;

    for suite in chosen {
        graph.add_unit(ExperimentSuite::new(suite, assembler.clone()).into_unit())?;
    }

    tracing::debug!(units = graph.len(), "FIS application graph built");
    Ok(graph)
}
