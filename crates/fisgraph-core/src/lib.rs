//! # fisgraph-core
//!
//! The deterministic infrastructure graph builder for FIS chaos experiments.
//!
//! This crate turns a set of provisioning units (independently deployable
//! stacks with declared outputs and cross-unit references) into a validated
//! deployment order, materializes them one at a time, and assembles the FIS
//! experiment templates they carry.
//!
//! ## Layout
//!
//! - `registry` - write-once store of published outputs
//! - `graph` - dependency graph, cycle detection, topological order
//! - `template` - experiment template records, validation and zone choice
//! - `catalog` - the fault kinds and how each one is drafted
//! - `orchestrator` - sequential deployment with a failure snapshot
//! - `stacks` - the concrete FIS application units
//! - `export` - checksummed JSON cloud assembly
//! - `storage` - redb-backed record of published exports
//!
//! ## Architectural Constraints
//!
//! - NO async, NO network, NO cloud SDK
//! - BTreeMap/BTreeSet only; iteration order never depends on hashing
//! - Randomness enters only through an injected `ZoneSource`

// =============================================================================
// MODULES
// =============================================================================

pub mod catalog;
pub mod context;
pub mod export;
pub mod graph;
pub mod orchestrator;
pub mod primitives;
pub mod registry;
pub mod resources;
pub mod stacks;
pub mod storage;
pub mod template;
pub mod types;
pub mod unit;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use context::DeploymentContext;
pub use resources::Resource;
pub use types::{FisgraphError, OutputName, ResourceRef, UnitId};

// =============================================================================
// RE-EXPORTS: Graph and Deployment
// =============================================================================

pub use graph::{DependencyGraph, DeploymentPlan};
pub use orchestrator::{DeploymentReport, StackOrchestrator, UnitReport};
pub use registry::Registry;
pub use unit::{Materialize, Materialized, ProvisioningUnit, UnitContext};

// =============================================================================
// RE-EXPORTS: Templates and Catalog
// =============================================================================

pub use catalog::FaultKind;
pub use template::{
    ExperimentTemplate, FaultParams, FixedZone, SeededZones, SelectionMode, TemplateAssembler,
    ThreadRngZones, Violation, ZoneSource,
};

// =============================================================================
// RE-EXPORTS: Export and Storage
// =============================================================================

#[cfg(feature = "crypto-hash")]
pub use export::assembly_crypto_hash;
pub use export::{
    AssemblyHeader, CloudAssembly, ExportEntry, export_assembly, import_assembly, verify_assembly,
};
pub use stacks::{EXPERIMENT_SUITES, fis_application};
pub use storage::{ExportRecord, ExportStore};
