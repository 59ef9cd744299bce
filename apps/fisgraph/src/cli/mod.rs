//! # fisgraph CLI Module
//!
//! This module implements the CLI interface for fisgraph.
//!
//! ## Available Commands
//!
//! - `plan` - Show the deployment order
//! - `synth` - Deploy the graph and write the cloud assembly
//! - `template` - Assemble and print a single experiment template
//! - `catalog` - List the fault kinds
//! - `exports` - List exports recorded by previous runs
//! - `hash` - Verify an assembly file and compute its BLAKE3 hash

mod commands;

use clap::{Parser, Subcommand};
use fisgraph_core::FisgraphError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// fisgraph - FIS experiment infrastructure synthesizer
///
/// Orders the provisioning units of the chaos-engineering stack, assembles
/// the experiment templates and writes a checksummed cloud assembly.
#[derive(Parser, Debug)]
#[command(name = "fisgraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the deployment config
    #[arg(short = 'c', long, global = true, default_value = "fisgraph.toml")]
    pub config: PathBuf,

    /// Path to the export store
    #[arg(short = 'E', long, global = true, default_value = "fisgraph-exports.redb")]
    pub exports_db: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the deployment order with dependencies and imports
    Plan {
        /// Experiment suites to include (repeatable; default from config, else all)
        #[arg(short, long = "suite")]
        suites: Vec<String>,
    },

    /// Deploy the graph and write the cloud assembly
    Synth {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Experiment suites to include (repeatable; default from config, else all)
        #[arg(short, long = "suite")]
        suites: Vec<String>,

        /// Seed for availability zone selection
        #[arg(short, long)]
        zone_seed: Option<u64>,

        /// Only materialize these units; the others are seeded from the export store
        #[arg(long)]
        only: Vec<String>,

        /// Record the resulting exports in the export store
        #[arg(short, long)]
        persist_exports: bool,
    },

    /// Assemble a single experiment template and print it
    Template {
        /// Fault kind (see `catalog`)
        kind: String,

        /// Seed for availability zone selection
        #[arg(short, long)]
        zone_seed: Option<u64>,
    },

    /// List fault kinds with their suite, parameters and imports
    Catalog,

    /// List exports recorded in the export store
    Exports,

    /// Verify an assembly file and compute its BLAKE3 hash
    Hash {
        /// Assembly file path
        #[arg(short, long)]
        input: PathBuf,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), FisgraphError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Plan { suites }) => cmd_plan(&cli.config, &suites, json_mode),
        Some(Commands::Synth {
            output,
            suites,
            zone_seed,
            only,
            persist_exports,
        }) => {
            let options = SynthOptions {
                suites,
                zone_seed,
                only,
                persist_exports,
            };
            cmd_synth(&cli.config, &cli.exports_db, &output, &options, json_mode)
        }
        Some(Commands::Template { kind, zone_seed }) => {
            cmd_template(&cli.config, &kind, zone_seed)
        }
        Some(Commands::Catalog) => cmd_catalog(json_mode),
        Some(Commands::Exports) => cmd_exports(&cli.exports_db, json_mode),
        Some(Commands::Hash { input }) => cmd_hash(&input, json_mode),
        None => {
            // No subcommand - show the plan by default
            cmd_plan(&cli.config, &[], json_mode)
        }
    }
}
