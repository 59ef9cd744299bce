//! # fisgraph
//!
//! Library half of the fisgraph binary: config loading and the CLI commands.
//! Integration tests drive the commands through this crate.

pub mod cli;
pub mod config;
