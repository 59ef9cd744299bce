//! # Storage
//!
//! Durable record of the outputs published by previous deployment runs.
//!
//! A selected deployment only materializes some units; the others are
//! expected to have published their exports already. `ExportStore` keeps
//! those exports across invocations so the registry can be seeded from disk.

pub mod redb_exports;

pub use redb_exports::{ExportRecord, ExportStore};
