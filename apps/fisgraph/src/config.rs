//! # Configuration
//!
//! Loading of `fisgraph.toml`: the deployment context plus synth defaults.
//!
//! ```toml
//! account = "123456789012"
//! region = "us-east-1"
//! stack_name = "FIS"
//! availability_zones = ["us-east-1a", "us-east-1b"]
//!
//! [params]
//! vpc_id = "vpc-0abc"
//! asg_name = "web-asg"
//!
//! [synth]
//! suites = ["AsgExp"]
//! zone_seed = 7
//! ```

use fisgraph_core::{DeploymentContext, FisgraphError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Default values for `synth`, overridable on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SynthConfig {
    /// Experiment suites to include; empty means all.
    #[serde(default)]
    pub suites: Vec<String>,
    /// Seed for availability zone selection; absent means random.
    #[serde(default)]
    pub zone_seed: Option<u64>,
}

/// Parsed `fisgraph.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FisgraphConfig {
    #[serde(flatten)]
    pub context: DeploymentContext,
    #[serde(default)]
    pub synth: SynthConfig,
}

impl FisgraphConfig {
    /// Parse and validate a config document.
    pub fn parse(text: &str) -> Result<Self, FisgraphError> {
        let config: Self =
            toml::from_str(text).map_err(|e| FisgraphError::InvalidConfig(e.to_string()))?;
        config.context.validate()?;

        for key in config.context.unknown_params() {
            tracing::warn!(param = key, "unknown context parameter ignored");
        }
        Ok(config)
    }

    /// Read, parse and validate a config file.
    pub fn load(path: &Path) -> Result<Self, FisgraphError> {
        let canonical = validate_file_path(path)?;
        validate_file_size(&canonical, MAX_CONFIG_FILE_SIZE)?;

        let text = std::fs::read_to_string(&canonical)
            .map_err(|e| FisgraphError::IoError(format!("Cannot read config: {}", e)))?;
        let config = Self::parse(&text)?;

        tracing::debug!(
            path = %canonical.display(),
            account = %config.context.account,
            region = %config.context.region,
            params = config.context.params.len(),
            "config loaded"
        );
        Ok(config)
    }
}

// =============================================================================
// PATH VALIDATION
// =============================================================================

/// Validate file size before reading.
pub fn validate_file_size(path: &Path, max_size: u64) -> Result<(), FisgraphError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| FisgraphError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(FisgraphError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path to an existing regular file.
///
/// Canonicalization resolves `..` and symlinks before anything is read.
pub fn validate_file_path(path: &Path) -> Result<PathBuf, FisgraphError> {
    let canonical = path.canonicalize().map_err(|e| {
        FisgraphError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(FisgraphError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path: the parent directory must exist.
pub fn validate_output_path(path: &Path) -> Result<PathBuf, FisgraphError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        FisgraphError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(FisgraphError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| FisgraphError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}
