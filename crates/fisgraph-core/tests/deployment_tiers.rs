//! # Deployment Tier Tests (T0-T3)
//!
//! End-to-end runs of the FIS application graph.
//!
//! ## Tiers
//! - T0: Graph Construction
//! - T1: Full Deployment
//! - T2: Failure Snapshot
//! - T3: Assembly Export and Export Store

use fisgraph_core::primitives::*;
use fisgraph_core::{
    CloudAssembly, DeploymentContext, DeploymentReport, ExportStore, FisgraphError, FixedZone,
    Registry, ResourceRef, SeededZones, StackOrchestrator, TemplateAssembler, UnitId,
    export_assembly, fis_application, import_assembly,
};
use std::collections::BTreeSet;

fn context() -> DeploymentContext {
    DeploymentContext::new("123456789012", "eu-west-1")
        .with_stack_name("chaos")
        .with_zones(["eu-west-1a", "eu-west-1b", "eu-west-1c"])
        .with_param(PARAM_VPC_ID, "vpc-0abc")
        .with_param(PARAM_ASG_NAME, "web-asg")
        .with_param(PARAM_TARGET_ROLE_NAME, "app-role")
        .with_param(PARAM_SECURITY_GROUP_ID, "sg-0abc")
        .with_param(PARAM_EKS_CLUSTER_NAME, "prod-cluster")
        .with_param(PARAM_SSM_PARAMETER_NAME, "lambda-chaos-config")
        .with_param(PARAM_S3_BUCKET_TO_DENY, "customer-data")
}

fn deploy(
    assembler: &TemplateAssembler,
    ctx: &DeploymentContext,
) -> Result<(DeploymentReport, Registry), FisgraphError> {
    let plan = fis_application(assembler, &[])?.into_plan()?;
    let mut registry = Registry::new();
    let report = StackOrchestrator::new(ctx).deploy(&plan, &mut registry)?;
    Ok((report, registry))
}

// =============================================================================
// TIER T0: GRAPH CONSTRUCTION
// =============================================================================

mod t0_graph_construction {
    use super::*;

    /// T0.1: Every suite reference is declared by an ancestor.
    #[test]
    fn application_references_are_valid() {
        let graph = fis_application(&TemplateAssembler::new(FixedZone(0)), &[]).expect("graph");
        graph.validate_references().expect("references");
    }

    /// T0.2: Suites that use SSM automations depend on the document unit.
    #[test]
    fn automation_suites_depend_on_documents() {
        let graph = fis_application(&TemplateAssembler::new(FixedZone(0)), &[]).expect("graph");
        for suite in [UNIT_NACL, UNIT_SECURITY_GROUP, UNIT_IAM_ACCESS, UNIT_LAMBDA] {
            let ancestors = graph.ancestors(&UnitId::new(suite)).expect("ancestors");
            assert!(ancestors.contains(&UnitId::new(UNIT_SSM_DOCS)), "{suite}");
        }
        let ancestors = graph
            .ancestors(&UnitId::new(UNIT_ASG))
            .expect("ancestors");
        assert!(!ancestors.contains(&UnitId::new(UNIT_SSM_DOCS)));
        assert!(ancestors.contains(&UnitId::new(UNIT_LOGS)));
    }
}

// =============================================================================
// TIER T1: FULL DEPLOYMENT
// =============================================================================

mod t1_full_deployment {
    use super::*;

    /// T1.1: All twelve units materialize and every catalog template is produced.
    #[test]
    fn full_deploy_produces_every_template() {
        let ctx = context();
        let (report, registry) =
            deploy(&TemplateAssembler::new(FixedZone(1)), &ctx).expect("deploy");

        assert_eq!(report.materialized.len(), 12);
        assert!(report.skipped.is_empty());
        assert_eq!(report.templates().count(), 14);

        let role_arn = registry
            .resolve(&ResourceRef::new(UNIT_ROLE, EXPORT_FIS_ROLE_ARN))
            .expect("role arn");
        assert!(role_arn.starts_with("arn:aws:iam::123456789012:role/"));
        assert!(report.templates().all(|t| t.role_arn == role_arn));
    }

    /// T1.2: Zone-scoped templates use the zone picked by the source.
    #[test]
    fn zone_scoped_templates_use_picked_zone() {
        let ctx = context();
        let (report, _) = deploy(&TemplateAssembler::new(FixedZone(2)), &ctx).expect("deploy");

        let zone_values: Vec<&str> = report
            .templates()
            .flat_map(|t| t.targets.values())
            .flat_map(|target| target.filters.iter())
            .filter(|f| f.path == "Placement.AvailabilityZone")
            .flat_map(|f| f.values.iter().map(String::as_str))
            .collect();
        assert!(!zone_values.is_empty());
        assert!(zone_values.iter().all(|z| *z == "eu-west-1c"));
    }

    /// T1.3: Same seed, same context, same assembly bytes.
    #[test]
    fn seeded_runs_are_byte_identical() {
        let ctx = context();
        let render = || {
            let (report, registry) =
                deploy(&TemplateAssembler::new(SeededZones::new(42)), &ctx).expect("deploy");
            export_assembly(&CloudAssembly::from_deployment(&ctx, &report, &registry))
                .expect("export")
        };
        assert_eq!(render(), render());
    }

    /// T1.4: A selected run reuses exports from a previous run.
    #[test]
    fn selected_run_uses_seeded_registry() {
        let ctx = context();
        let assembler = TemplateAssembler::new(FixedZone(0));
        let (_, previous) = deploy(&assembler, &ctx).expect("deploy");

        let plan = fis_application(&assembler, &[])
            .expect("graph")
            .into_plan()
            .expect("plan");
        let base: BTreeSet<UnitId> = [UNIT_SSM_DOCS, UNIT_LOGS, UNIT_ROLE, UNIT_STOP_CONDITION]
            .into_iter()
            .map(UnitId::new)
            .collect();

        let mut seeded = Registry::new();
        for (reference, value) in previous.entries() {
            if base.contains(&reference.unit) {
                seeded
                    .publish(reference.unit.clone(), reference.output.clone(), value)
                    .expect("seed");
            }
        }

        let selection: BTreeSet<UnitId> = [UnitId::new(UNIT_NACL)].into_iter().collect();
        let report = StackOrchestrator::new(&ctx)
            .deploy_selected(&plan, &mut seeded, &selection)
            .expect("selected deploy");

        assert_eq!(report.completed(), vec![UnitId::new(UNIT_NACL)]);
        assert_eq!(report.skipped.len(), 11);
        assert_eq!(report.templates().count(), 1);
    }
}

// =============================================================================
// TIER T2: FAILURE SNAPSHOT
// =============================================================================

mod t2_failure_snapshot {
    use super::*;

    /// T2.1: A missing parameter halts the run at the first unit that needs it.
    #[test]
    fn missing_asg_name_halts_at_asg_suite() {
        let mut ctx = context();
        ctx.params.remove(PARAM_ASG_NAME);

        let result = deploy(&TemplateAssembler::new(FixedZone(0)), &ctx);
        assert!(matches!(
            result,
            Err(FisgraphError::MaterializationFailure { .. })
        ));
        if let Err(FisgraphError::MaterializationFailure {
            unit,
            completed,
            cause,
        }) = result
        {
            assert_eq!(unit, UnitId::new(UNIT_ASG));
            let expected: Vec<UnitId> = [
                UNIT_SSM_DOCS,
                UNIT_LOGS,
                UNIT_ROLE,
                UNIT_STOP_CONDITION,
                UNIT_EC2_INSTANCES,
                UNIT_EC2_CONTROL_PLANE,
                UNIT_NACL,
            ]
            .into_iter()
            .map(UnitId::new)
            .collect();
            assert_eq!(completed, expected);
            assert!(matches!(*cause, FisgraphError::InvalidTemplate { .. }));
        }
    }

    /// T2.2: Without zones every zone-scoped template is invalid.
    #[test]
    fn no_zones_fails_first_zone_scoped_suite() {
        let mut ctx = context();
        ctx.availability_zones.clear();

        let result = deploy(&TemplateAssembler::new(FixedZone(0)), &ctx);
        assert!(matches!(
            result,
            Err(FisgraphError::MaterializationFailure { ref unit, .. })
                if unit.as_str() == UNIT_EC2_INSTANCES
        ));
    }
}

// =============================================================================
// TIER T3: ASSEMBLY EXPORT AND EXPORT STORE
// =============================================================================

mod t3_export {
    use super::*;
    use tempfile::tempdir;

    /// T3.1: An exported assembly imports back unchanged.
    #[test]
    fn assembly_round_trip() {
        let ctx = context();
        let (report, registry) =
            deploy(&TemplateAssembler::new(FixedZone(0)), &ctx).expect("deploy");
        let assembly = CloudAssembly::from_deployment(&ctx, &report, &registry);

        let data = export_assembly(&assembly).expect("export");
        let imported = import_assembly(&data).expect("import");
        assert_eq!(imported.templates().count(), 14);
        assert_eq!(imported, assembly);
    }

    /// T3.2: Editing a template in the file is detected.
    #[test]
    fn tampered_assembly_is_rejected() {
        let ctx = context();
        let (report, registry) =
            deploy(&TemplateAssembler::new(FixedZone(0)), &ctx).expect("deploy");
        let data = export_assembly(&CloudAssembly::from_deployment(&ctx, &report, &registry))
            .expect("export");

        let tampered = data.replacen("web-asg", "other-asg", 1);
        assert_ne!(tampered, data);
        assert!(matches!(
            import_assembly(&tampered),
            Err(FisgraphError::SerializationError(_))
        ));
    }

    /// T3.3: Exports persisted after a run seed the next one.
    #[test]
    fn export_store_round_trip() {
        let ctx = context();
        let (_, registry) = deploy(&TemplateAssembler::new(FixedZone(0)), &ctx).expect("deploy");

        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("exports.redb");
        {
            let store = ExportStore::open(&db_path).expect("open db");
            assert_eq!(store.persist(&registry).expect("persist"), registry.len());
        }

        let store = ExportStore::open(&db_path).expect("reopen db");
        let loaded = store.load().expect("load");
        let original: Vec<_> = registry.entries().collect();
        let reloaded: Vec<_> = loaded.entries().collect();
        assert_eq!(original, reloaded);
    }
}
