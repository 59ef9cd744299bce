//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! Each command is split into a function that computes its result and a
//! `cmd_*` wrapper that prints it, so the results can be tested directly.

use crate::config::{FisgraphConfig, validate_file_path, validate_file_size, validate_output_path};
use fisgraph_core::{
    CloudAssembly, ExperimentTemplate, ExportRecord, ExportStore, FaultKind, FisgraphError,
    Registry, SeededZones, StackOrchestrator, TemplateAssembler, UnitId, assembly_crypto_hash,
    export_assembly, fis_application, import_assembly,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum assembly file size accepted by `hash` (100 MB).
const MAX_ASSEMBLY_FILE_SIZE: u64 = 100 * 1024 * 1024;

// =============================================================================
// SHARED HELPERS
// =============================================================================

/// Assembler with a seeded zone source, or a random one without a seed.
fn assembler(zone_seed: Option<u64>) -> TemplateAssembler {
    match zone_seed {
        Some(seed) => TemplateAssembler::new(SeededZones::new(seed)),
        None => TemplateAssembler::default(),
    }
}

/// Suites from the command line win over the config file.
fn pick_suites(cli: &[String], config: &FisgraphConfig) -> Vec<String> {
    if cli.is_empty() {
        config.synth.suites.clone()
    } else {
        cli.to_vec()
    }
}

fn print_json(value: &impl Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

// =============================================================================
// PLAN COMMAND
// =============================================================================

/// One row of the deployment plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    pub position: usize,
    pub unit: String,
    pub depends_on: Vec<String>,
    pub imports: Vec<String>,
    pub outputs: Vec<String>,
}

/// Compute the deployment order for the configured suites.
pub fn plan_entries(
    config: &FisgraphConfig,
    suites: &[String],
) -> Result<Vec<PlanEntry>, FisgraphError> {
    let suites = pick_suites(suites, config);
    let plan = fis_application(&TemplateAssembler::default(), &suites)?.into_plan()?;

    Ok(plan
        .units()
        .iter()
        .enumerate()
        .map(|(i, unit)| PlanEntry {
            position: i + 1,
            unit: unit.id().to_string(),
            depends_on: unit.dependencies().iter().map(ToString::to_string).collect(),
            imports: unit
                .declared_imports()
                .iter()
                .map(ToString::to_string)
                .collect(),
            outputs: unit
                .declared_outputs()
                .iter()
                .map(|o| o.name.to_string())
                .collect(),
        })
        .collect())
}

/// Print the deployment order.
pub fn cmd_plan(config_path: &Path, suites: &[String], json_mode: bool) -> Result<(), FisgraphError> {
    let config = FisgraphConfig::load(config_path)?;
    let entries = plan_entries(&config, suites)?;

    if json_mode {
        print_json(&entries);
        return Ok(());
    }

    println!("Deployment Plan");
    println!("===============");
    println!(
        "Account: {}  Region: {}  Stack: {}",
        config.context.account, config.context.region, config.context.stack_name
    );
    println!();
    for entry in &entries {
        println!("{:>3}. {}", entry.position, entry.unit);
        if !entry.depends_on.is_empty() {
            println!("       depends on: {}", entry.depends_on.join(", "));
        }
        for import in &entry.imports {
            println!("       imports:    {}", import);
        }
    }

    Ok(())
}

// =============================================================================
// SYNTH COMMAND
// =============================================================================

/// Options of one `synth` run.
#[derive(Debug, Clone, Default)]
pub struct SynthOptions {
    pub suites: Vec<String>,
    pub zone_seed: Option<u64>,
    /// Units to materialize; empty means every unit.
    pub only: Vec<String>,
    pub persist_exports: bool,
}

/// Result of a `synth` run.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub assembly: CloudAssembly,
    pub registry: Registry,
}

/// Deploy the graph and build the cloud assembly.
///
/// With `only`, the registry is seeded with the stored exports of every
/// unit that is not selected.
pub fn synthesize(
    config: &FisgraphConfig,
    options: &SynthOptions,
    store: Option<&ExportStore>,
) -> Result<Synthesis, FisgraphError> {
    let context = &config.context;
    let suites = pick_suites(&options.suites, config);
    let zone_seed = options.zone_seed.or(config.synth.zone_seed);

    let plan = fis_application(&assembler(zone_seed), &suites)?.into_plan()?;
    let orchestrator = StackOrchestrator::new(context);

    let (report, registry) = if options.only.is_empty() {
        let mut registry = Registry::new();
        let report = orchestrator.deploy(&plan, &mut registry)?;
        (report, registry)
    } else {
        let selection: BTreeSet<UnitId> =
            options.only.iter().map(|u| UnitId::new(u.as_str())).collect();

        let mut registry = Registry::new();
        if let Some(store) = store {
            for record in store.list()? {
                if !selection.contains(&record.unit) {
                    registry.publish(record.unit, record.name, record.value)?;
                }
            }
        }
        tracing::info!(
            selected = selection.len(),
            seeded = registry.len(),
            "selected deployment"
        );
        let report = orchestrator.deploy_selected(&plan, &mut registry, &selection)?;
        (report, registry)
    };

    Ok(Synthesis {
        assembly: CloudAssembly::from_deployment(context, &report, &registry),
        registry,
    })
}

/// Deploy the graph and write the cloud assembly to `output`.
pub fn cmd_synth(
    config_path: &Path,
    exports_db: &Path,
    output: &Path,
    options: &SynthOptions,
    json_mode: bool,
) -> Result<(), FisgraphError> {
    let config = FisgraphConfig::load(config_path)?;
    let output = validate_output_path(output)?;

    let store = if options.persist_exports || !options.only.is_empty() {
        Some(ExportStore::open(exports_db)?)
    } else {
        None
    };

    let synthesis = synthesize(&config, options, store.as_ref())?;
    let data = export_assembly(&synthesis.assembly)?;
    std::fs::write(&output, &data).map_err(|e| FisgraphError::IoError(e.to_string()))?;

    let persisted = match (&store, options.persist_exports) {
        (Some(store), true) => Some(store.persist(&synthesis.registry)?),
        _ => None,
    };

    let assembly = &synthesis.assembly;
    tracing::info!(
        output = %output.display(),
        units = assembly.units.len(),
        templates = assembly.templates().count(),
        "assembly written"
    );

    if json_mode {
        print_json(&serde_json::json!({
            "output": output.to_string_lossy(),
            "units": assembly.order,
            "skipped": assembly.skipped,
            "templates": assembly.templates().count(),
            "exports": assembly.exports.len(),
            "persisted": persisted,
            "checksum": assembly.checksum()?,
        }));
        return Ok(());
    }

    println!("Synthesized {} unit(s) to {:?}", assembly.units.len(), output);
    for unit in &assembly.order {
        println!("  + {}", unit);
    }
    for unit in &assembly.skipped {
        println!("  = {} (from export store)", unit);
    }
    println!("Templates: {}", assembly.templates().count());
    println!("Exports:   {}", assembly.exports.len());
    if let Some(count) = persisted {
        println!("Persisted {} export(s) to {:?}", count, exports_db);
    }

    Ok(())
}

// =============================================================================
// TEMPLATE COMMAND
// =============================================================================

/// Assemble the template of one fault kind.
///
/// The kind's suite is deployed together with the base units, so every
/// parameter that suite reads must be configured.
pub fn single_template(
    config: &FisgraphConfig,
    kind: &str,
    zone_seed: Option<u64>,
) -> Result<ExperimentTemplate, FisgraphError> {
    let kind: FaultKind = kind.parse()?;
    let zone_seed = zone_seed.or(config.synth.zone_seed);

    let plan =
        fis_application(&assembler(zone_seed), &[kind.suite().to_string()])?.into_plan()?;
    let mut registry = Registry::new();
    let report = StackOrchestrator::new(&config.context).deploy(&plan, &mut registry)?;

    report
        .templates()
        .find(|t| t.logical_id == kind.logical_id())
        .cloned()
        .ok_or_else(|| FisgraphError::UnknownFaultKind(kind.to_string()))
}

/// Print one experiment template as JSON.
pub fn cmd_template(
    config_path: &Path,
    kind: &str,
    zone_seed: Option<u64>,
) -> Result<(), FisgraphError> {
    let config = FisgraphConfig::load(config_path)?;
    let template = single_template(&config, kind, zone_seed)?;
    print_json(&template);
    Ok(())
}

// =============================================================================
// CATALOG COMMAND
// =============================================================================

/// One row of the fault catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub kind: &'static str,
    pub suite: &'static str,
    pub template: &'static str,
    pub description: &'static str,
    pub params: Vec<&'static str>,
    pub imports: Vec<String>,
    pub zone_scoped: bool,
}

/// Every fault kind in catalog order.
pub fn catalog_entries() -> Vec<CatalogEntry> {
    FaultKind::ALL
        .into_iter()
        .map(|kind| CatalogEntry {
            kind: kind.as_str(),
            suite: kind.suite(),
            template: kind.logical_id(),
            description: kind.description(),
            params: kind.required_params().to_vec(),
            imports: kind
                .required_imports()
                .iter()
                .map(ToString::to_string)
                .collect(),
            zone_scoped: kind.uses_zone(),
        })
        .collect()
}

/// Print the fault catalog.
pub fn cmd_catalog(json_mode: bool) -> Result<(), FisgraphError> {
    let entries = catalog_entries();

    if json_mode {
        print_json(&entries);
        return Ok(());
    }

    println!("Fault Catalog");
    println!("=============");
    for entry in &entries {
        let zone = if entry.zone_scoped { " [az]" } else { "" };
        println!("{:<26} {:<12}{}", entry.kind, entry.suite, zone);
        println!("    {}", entry.description);
        println!("    params:  {}", entry.params.join(", "));
    }

    Ok(())
}

// =============================================================================
// EXPORTS COMMAND
// =============================================================================

/// List the exports recorded in the export store.
pub fn cmd_exports(exports_db: &Path, json_mode: bool) -> Result<(), FisgraphError> {
    let store = ExportStore::open(exports_db)?;
    let records: Vec<ExportRecord> = store.list()?;

    if json_mode {
        print_json(&records);
        return Ok(());
    }

    if records.is_empty() {
        println!("No exports recorded in {:?}", exports_db);
        return Ok(());
    }
    for record in &records {
        println!("{}/{} = {}", record.unit, record.name, record.value);
    }

    Ok(())
}

// =============================================================================
// HASH COMMAND
// =============================================================================

/// Verification result of an assembly file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HashReport {
    pub algorithm: &'static str,
    pub hash: String,
    pub checksum: u64,
    pub units: usize,
    pub exports: usize,
}

/// Verify an assembly document and hash it.
pub fn hash_assembly(data: &str) -> Result<HashReport, FisgraphError> {
    let assembly = import_assembly(data)?;
    Ok(HashReport {
        algorithm: "BLAKE3",
        hash: assembly_crypto_hash(data),
        checksum: assembly.checksum()?,
        units: assembly.units.len(),
        exports: assembly.exports.len(),
    })
}

/// Verify an assembly file and print its BLAKE3 hash.
pub fn cmd_hash(input: &Path, json_mode: bool) -> Result<(), FisgraphError> {
    let canonical = validate_file_path(input)?;
    validate_file_size(&canonical, MAX_ASSEMBLY_FILE_SIZE)?;
    let data = std::fs::read_to_string(&canonical)
        .map_err(|e| FisgraphError::IoError(e.to_string()))?;

    let report = hash_assembly(&data)?;

    if json_mode {
        print_json(&report);
        return Ok(());
    }

    println!("{}: {}", report.algorithm, report.hash);
    println!("Checksum: {}", report.checksum);
    println!("Units:    {}", report.units);
    println!("Exports:  {}", report.exports);

    Ok(())
}
