//! Template assembly: fault kind + parameters -> validated template.

use super::zone::{ThreadRngZones, ZoneSource};
use super::{finalize, ExperimentTemplate};
use crate::catalog::FaultKind;
use crate::{DeploymentContext, FisgraphError};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Inputs of one assembly: the deployment context and the resolved imports,
/// keyed by export name (`FISIamRoleArn`, `StopConditionArn`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultParams {
    pub context: DeploymentContext,
    pub imports: BTreeMap<String, String>,
}

impl FaultParams {
    #[must_use]
    pub fn new(context: DeploymentContext) -> Self {
        Self {
            context,
            imports: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_imports(mut self, imports: BTreeMap<String, String>) -> Self {
        self.imports.extend(imports);
        self
    }

    #[must_use]
    pub fn with_import(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.imports.insert(name.into(), value.into());
        self
    }

    /// Look up an import. Blank values count as absent.
    #[must_use]
    pub fn import(&self, name: &str) -> Option<&str> {
        self.imports
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Builds experiment templates from the fault catalog.
///
/// Cloning is cheap; clones share the zone source.
#[derive(Clone)]
pub struct TemplateAssembler {
    zones: Arc<dyn ZoneSource>,
}

impl fmt::Debug for TemplateAssembler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateAssembler").finish_non_exhaustive()
    }
}

impl Default for TemplateAssembler {
    fn default() -> Self {
        Self::new(ThreadRngZones)
    }
}

impl TemplateAssembler {
    /// Create an assembler that picks zones with `zones`.
    pub fn new(zones: impl ZoneSource + 'static) -> Self {
        Self {
            zones: Arc::new(zones),
        }
    }

    /// Assemble the template of `kind`.
    pub fn assemble(
        &self,
        kind: FaultKind,
        params: &FaultParams,
    ) -> Result<ExperimentTemplate, FisgraphError> {
        let draft = kind.draft(params, self.zones.as_ref());
        let template = finalize(draft)?;
        tracing::debug!(
            kind = kind.as_str(),
            template = %template.logical_id,
            actions = template.actions.len(),
            targets = template.targets.len(),
            "template assembled"
        );
        Ok(template)
    }

    /// Assemble by kebab-case kind name (`terminate-asg`, ...).
    pub fn assemble_named(
        &self,
        kind: &str,
        params: &FaultParams,
    ) -> Result<ExperimentTemplate, FisgraphError> {
        self.assemble(kind.parse()?, params)
    }
}

// =============================================================================
// TESTS
// =============================================================================
