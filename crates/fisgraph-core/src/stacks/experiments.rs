//! Experiment suites: one unit per fault family, holding the templates of
//! every catalog kind the suite owns.

use crate::catalog::{s3_deny_policy_name, FaultKind};
use crate::primitives::{
    PARAM_S3_BUCKET_TO_DENY, UNIT_IAM_ACCESS, UNIT_ROLE, UNIT_SSM_DOCS, UNIT_STOP_CONDITION,
};
use crate::resources::{PolicySpec, PolicyStatement, Resource};
use crate::template::{FaultParams, TemplateAssembler};
use crate::unit::{Materialize, Materialized, ProvisioningUnit, UnitContext};
use crate::FisgraphError;

/// Materializer of one experiment suite.
#[derive(Debug, Clone)]
pub struct ExperimentSuite {
    suite: &'static str,
    assembler: TemplateAssembler,
}

impl ExperimentSuite {
    #[must_use]
    pub fn new(suite: &'static str, assembler: TemplateAssembler) -> Self {
        Self { suite, assembler }
    }

    /// The suite as a provisioning unit.
    ///
    /// Depends on the FIS role and the stop condition, and on the SSM
    /// documents when one of its kinds imports from them.
    pub fn into_unit(self) -> ProvisioningUnit {
        let imports: Vec<_> = FaultKind::in_suite(self.suite)
            .flat_map(FaultKind::required_imports)
            .collect();
        let needs_documents = imports.iter().any(|r| r.unit.as_str() == UNIT_SSM_DOCS);

        let mut unit = ProvisioningUnit::new(self.suite, self)
            .depends_on(UNIT_ROLE)
            .depends_on(UNIT_STOP_CONDITION);
        if needs_documents {
            unit = unit.depends_on(UNIT_SSM_DOCS);
        }
        imports.into_iter().fold(unit, ProvisioningUnit::imports)
    }
}

impl Materialize for ExperimentSuite {
    fn materialize(&self, ctx: &UnitContext<'_>) -> Result<Materialized, FisgraphError> {
        let deployment = ctx.deployment();
        let params = FaultParams::new(deployment.clone()).with_imports(ctx.resolved_imports()?);

        // A missing bucket surfaces as a template violation.
        let templates = FaultKind::in_suite(self.suite)
            .map(|kind| self.assembler.assemble(kind, &params))
            .collect::<Result<Vec<_>, _>>()?;

        let mut produced = Materialized::new();

        if self.suite == UNIT_IAM_ACCESS {
            let bucket = deployment.require(PARAM_S3_BUCKET_TO_DENY)?;
            let policy_name = s3_deny_policy_name(&params);
            produced = produced.resource(Resource::ManagedPolicy(PolicySpec {
                logical_id: "s3-deny".to_string(),
                arn: deployment.policy_arn(&policy_name),
                policy_name,
                statements: vec![PolicyStatement::deny(
                    &["s3:PutObject", "s3:GetObject", "s3:DeleteObject"],
                    &[format!("arn:aws:s3:::{}", bucket).as_str()],
                )
                .with_sid("DenyAccessToS3Resources")],
            }));
        }

        for template in templates {
            produced = produced.resource(Resource::ExperimentTemplate(template));
        }

        Ok(produced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::*;
    use crate::registry::Registry;
    use crate::template::{FixedZone, Violation};
    use crate::DeploymentContext;

    fn registry_with_base_exports() -> Registry {
        let mut registry = Registry::new();
        registry
            .publish(UNIT_ROLE, EXPORT_FIS_ROLE_ARN, "arn:role")
            .expect("publish");
        registry
            .publish(UNIT_STOP_CONDITION, EXPORT_STOP_CONDITION_ARN, "arn:alarm")
            .expect("publish");
        registry
            .publish(UNIT_SSM_DOCS, EXPORT_IAM_ACCESS_DOC_NAME, "doc")
            .expect("publish");
        registry
            .publish(UNIT_SSM_DOCS, EXPORT_IAM_ACCESS_ROLE_ARN, "arn:ssma")
            .expect("publish");
        registry
    }

    #[test]
    fn suite_wiring_follows_catalog() {
        let unit = ExperimentSuite::new(UNIT_ASG, TemplateAssembler::new(FixedZone(0))).into_unit();
        let deps: Vec<_> = unit.dependencies().iter().map(|d| d.as_str()).collect();
        assert_eq!(deps, vec![UNIT_ROLE, UNIT_STOP_CONDITION]);

        let unit =
            ExperimentSuite::new(UNIT_NACL, TemplateAssembler::new(FixedZone(0))).into_unit();
        assert!(unit.dependencies().iter().any(|d| d.as_str() == UNIT_SSM_DOCS));
        assert_eq!(unit.declared_imports().len(), 4);
    }

    #[test]
    fn iam_access_suite_adds_deny_policy() {
        let unit = ExperimentSuite::new(UNIT_IAM_ACCESS, TemplateAssembler::new(FixedZone(0)))
            .into_unit();
        let registry = registry_with_base_exports();
        let deployment = DeploymentContext::new("123456789012", "us-east-1")
            .with_param(PARAM_TARGET_ROLE_NAME, "app-role")
            .with_param(PARAM_S3_BUCKET_TO_DENY, "data-bucket");

        let produced = unit
            .materialize(&UnitContext::new(&unit, &registry, &deployment))
            .expect("materialize");

        let kinds: Vec<_> = produced.resources.iter().map(Resource::kind).collect();
        assert_eq!(kinds, vec!["managed_policy", "experiment_template"]);
        let denied = match &produced.resources[0] {
            Resource::ManagedPolicy(policy) => policy.statements[0].resources.clone(),
            _ => Vec::new(),
        };
        assert_eq!(denied, vec!["arn:aws:s3:::data-bucket".to_string()]);
    }

    #[test]
    fn missing_bucket_is_reported_with_other_violations() {
        let unit = ExperimentSuite::new(UNIT_IAM_ACCESS, TemplateAssembler::new(FixedZone(0)))
            .into_unit();
        let registry = registry_with_base_exports();
        let deployment = DeploymentContext::new("123456789012", "us-east-1");

        let result = unit.materialize(&UnitContext::new(&unit, &registry, &deployment));
        assert!(matches!(
            result,
            Err(FisgraphError::InvalidTemplate { ref violations, .. })
                if violations.contains(&Violation::MissingParameter(PARAM_S3_BUCKET_TO_DENY.to_string()))
                    && violations.contains(&Violation::MissingParameter(PARAM_TARGET_ROLE_NAME.to_string()))
        ));
    }

    #[test]
    fn invalid_template_surfaces_as_error() {
        let unit = ExperimentSuite::new(UNIT_ASG, TemplateAssembler::new(FixedZone(0))).into_unit();
        let registry = registry_with_base_exports();
        let deployment = DeploymentContext::new("1", "us-east-1").with_zones(["us-east-1a"]);

        let result = unit.materialize(&UnitContext::new(&unit, &registry, &deployment));
        assert!(matches!(result, Err(FisgraphError::InvalidTemplate { .. })));
    }
}
