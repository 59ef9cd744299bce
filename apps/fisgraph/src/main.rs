//! # fisgraph - FIS Experiment Infrastructure Synthesizer
//!
//! The main binary for the fisgraph deterministic infrastructure graph.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │               apps/fisgraph (THE BINARY)            │
//! │                                                     │
//! │  ┌─────────────┐   ┌─────────────┐   ┌───────────┐  │
//! │  │    CLI      │   │   Config    │   │  Export   │  │
//! │  │   (clap)    │   │   (toml)    │   │  store    │  │
//! │  └──────┬──────┘   └──────┬──────┘   └─────┬─────┘  │
//! │         └─────────────────┼────────────────┘        │
//! │                           ▼                         │
//! │                  ┌────────────────┐                 │
//! │                  │ fisgraph-core  │                 │
//! │                  │  (THE LOGIC)   │                 │
//! │                  └────────────────┘                 │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! fisgraph plan
//! fisgraph synth -o assembly.json --zone-seed 7 --persist-exports
//! fisgraph synth -o assembly.json --only NaclExp
//! fisgraph template terminate-asg
//! fisgraph hash -i assembly.json
//! ```

use clap::Parser;
use fisgraph::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // FISGRAPH_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("FISGRAPH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "fisgraph=debug,fisgraph_core=debug"
    } else {
        "fisgraph=info,fisgraph_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    // Logs go to stderr so JSON command output stays parseable.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    eprintln!(
        "fisgraph v{} - FIS experiment infrastructure synthesizer",
        env!("CARGO_PKG_VERSION")
    );
}
