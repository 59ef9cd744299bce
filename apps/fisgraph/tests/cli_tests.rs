//! Integration tests for config loading and the CLI commands.

use clap::Parser;
use fisgraph::cli::{
    Cli, Commands, SynthOptions, catalog_entries, hash_assembly, plan_entries, single_template,
    synthesize,
};
use fisgraph::config::FisgraphConfig;
use fisgraph_core::{ExportStore, FisgraphError, UnitId, export_assembly};
use std::io::Write;
use tempfile::{NamedTempFile, tempdir};

const FULL_CONFIG: &str = r#"
account = "123456789012"
region = "us-east-1"
stack_name = "chaos"
availability_zones = ["us-east-1a", "us-east-1b"]

[params]
vpc_id = "vpc-0abc"
asg_name = "web-asg"
target_role_name = "app-role"
security_group_id = "sg-0abc"
eks_cluster_name = "prod"
ssm_parameter_name = "lambda-chaos"
s3-bucket-to-deny = "customer-data"
"#;

fn config() -> FisgraphConfig {
    FisgraphConfig::parse(FULL_CONFIG).expect("config")
}

fn seeded(seed: u64) -> SynthOptions {
    SynthOptions {
        zone_seed: Some(seed),
        ..SynthOptions::default()
    }
}

// =============================================================================
// CONFIG
// =============================================================================

#[test]
fn config_loads_from_file() {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(FULL_CONFIG.as_bytes()).expect("write");

    let loaded = FisgraphConfig::load(file.path()).expect("load");
    assert_eq!(loaded, config());
    assert_eq!(loaded.context.stack_name, "chaos");
}

#[test]
fn missing_config_file_is_io_error() {
    let temp = tempdir().expect("temp dir");
    let result = FisgraphConfig::load(&temp.path().join("absent.toml"));
    assert!(matches!(result, Err(FisgraphError::IoError(_))));
}

#[test]
fn config_path_must_be_a_file() {
    let temp = tempdir().expect("temp dir");
    let result = FisgraphConfig::load(temp.path());
    assert!(matches!(result, Err(FisgraphError::IoError(_))));
}

// =============================================================================
// ARGUMENT PARSING
// =============================================================================

#[test]
fn synth_arguments_parse() {
    let cli = Cli::try_parse_from([
        "fisgraph",
        "--json-mode",
        "synth",
        "-o",
        "assembly.json",
        "--suite",
        "AsgExp",
        "--only",
        "AsgExp",
        "--zone-seed",
        "9",
        "--persist-exports",
    ])
    .expect("parse");

    assert!(cli.json_mode);
    assert!(matches!(
        cli.command,
        Some(Commands::Synth { ref suites, ref only, zone_seed: Some(9), persist_exports: true, .. })
            if suites == &["AsgExp".to_string()] && only == &["AsgExp".to_string()]
    ));
}

#[test]
fn synth_requires_output() {
    assert!(Cli::try_parse_from(["fisgraph", "synth"]).is_err());
}

// =============================================================================
// COMMANDS
// =============================================================================

#[test]
fn catalog_lists_every_kind_once() {
    let entries = catalog_entries();
    assert_eq!(entries.len(), 14);

    let terminate = entries
        .iter()
        .find(|e| e.kind == "terminate-asg")
        .expect("terminate-asg");
    assert_eq!(terminate.suite, "AsgExp");
    assert_eq!(terminate.params, vec!["asg_name"]);
    assert!(terminate.zone_scoped);
}

#[test]
fn plan_lists_base_units_first() {
    let entries = plan_entries(&config(), &[]).expect("plan");
    assert_eq!(entries.len(), 12);
    assert_eq!(entries[0].unit, "FisSsmDocs");
    assert_eq!(entries[0].position, 1);

    let role = entries.iter().find(|e| e.unit == "FisRole").expect("role");
    assert_eq!(role.depends_on, vec!["FisLogs".to_string()]);
    assert!(role.imports.contains(&"FisLogs/fisS3BucketArn".to_string()));
}

#[test]
fn plan_uses_config_suites_when_none_given() {
    let mut config = config();
    config.synth.suites = vec!["EksExp".to_string()];

    let units: Vec<String> = plan_entries(&config, &[])
        .expect("plan")
        .into_iter()
        .map(|e| e.unit)
        .collect();
    assert_eq!(units, vec!["FisLogs", "FisRole", "StopCond", "EksExp"]);
}

#[test]
fn synth_with_seed_is_reproducible() {
    let first = synthesize(&config(), &seeded(3), None).expect("synth");
    let second = synthesize(&config(), &seeded(3), None).expect("synth");

    assert_eq!(first.assembly.units.len(), 12);
    assert_eq!(
        export_assembly(&first.assembly).expect("export"),
        export_assembly(&second.assembly).expect("export")
    );
}

#[test]
fn selected_synth_reads_exports_from_store() {
    let temp = tempdir().expect("temp dir");
    let store = ExportStore::open(temp.path().join("exports.redb")).expect("open db");

    let full = synthesize(&config(), &seeded(1), None).expect("synth");
    store.persist(&full.registry).expect("persist");

    let options = SynthOptions {
        only: vec!["NaclExp".to_string()],
        ..seeded(1)
    };
    let selected = synthesize(&config(), &options, Some(&store)).expect("selected synth");

    assert_eq!(selected.assembly.order, vec![UnitId::new("NaclExp")]);
    assert_eq!(selected.assembly.skipped.len(), 11);
    assert_eq!(selected.registry.len(), full.registry.len());
}

#[test]
fn selected_synth_without_store_fails() {
    let options = SynthOptions {
        only: vec!["NaclExp".to_string()],
        ..seeded(1)
    };
    let result = synthesize(&config(), &options, None);
    assert!(matches!(
        result,
        Err(FisgraphError::MaterializationFailure { ref cause, .. })
            if matches!(**cause, FisgraphError::UnresolvedReference(_))
    ));
}

#[test]
fn single_template_is_assembled() {
    let template = single_template(&config(), "terminate-asg", Some(0)).expect("template");
    assert_eq!(template.logical_id, "fis-template-terminate-instances-in-asg-az");
    assert_eq!(template.actions.len(), 1);
}

#[test]
fn single_template_needs_only_its_own_params() {
    let config = FisgraphConfig::parse(
        r#"
account = "123456789012"
region = "us-east-1"
availability_zones = ["us-east-1a"]

[params]
asg_name = "web-asg"
"#,
    )
    .expect("config");

    let template = single_template(&config, "terminate-asg", None).expect("template");
    assert_eq!(template.logical_id, "fis-template-terminate-instances-in-asg-az");
}

#[test]
fn single_template_rejects_unknown_kind() {
    let result = single_template(&config(), "unplug-everything", None);
    assert!(matches!(result, Err(FisgraphError::UnknownFaultKind(_))));
}

#[test]
fn hash_verifies_assembly() {
    let synthesis = synthesize(&config(), &seeded(5), None).expect("synth");
    let data = export_assembly(&synthesis.assembly).expect("export");

    let report = hash_assembly(&data).expect("hash");
    assert_eq!(report.algorithm, "BLAKE3");
    assert_eq!(report.hash.len(), 64);
    assert_eq!(report.units, 12);

    let tampered = data.replacen("vpc-0abc", "vpc-evil", 1);
    assert!(hash_assembly(&tampered).is_err());
}
