//! # Cloud Assembly Export
//!
//! Deterministic JSON rendering of a deployment run.
//!
//! The assembly lists the deployment order, every materialized unit with its
//! outputs and resources, and the registry contents. It is wrapped in a
//! header carrying a checksum of the body, so a consumer can detect an
//! edited or truncated file before applying it.
//!
//! Two runs over the same context (and the same zone seed) produce
//! byte-identical output.

use crate::orchestrator::{DeploymentReport, UnitReport};
use crate::primitives::MAX_UNITS;
use crate::registry::Registry;
use crate::template::ExperimentTemplate;
use crate::{DeploymentContext, FisgraphError, OutputName, Resource, UnitId};
use serde::{Deserialize, Serialize};

// =============================================================================
// FORMAT
// =============================================================================

/// Format marker stored in every header.
pub const ASSEMBLY_FORMAT: &str = "fisgraph-assembly";

/// Current assembly format version.
pub const ASSEMBLY_VERSION: u8 = 1;

/// Header of an assembly file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyHeader {
    pub format: String,
    pub version: u8,
    pub unit_count: u64,
    pub export_count: u64,
    /// Checksum of the body (rotate-XOR over its compact JSON bytes).
    pub checksum: u64,
}

impl AssemblyHeader {
    #[must_use]
    pub fn new(unit_count: u64, export_count: u64, checksum: u64) -> Self {
        Self {
            format: ASSEMBLY_FORMAT.to_string(),
            version: ASSEMBLY_VERSION,
            unit_count,
            export_count,
            checksum,
        }
    }

    /// Validate format marker, version and size limits.
    pub fn validate(&self) -> Result<(), FisgraphError> {
        if self.format != ASSEMBLY_FORMAT {
            return Err(FisgraphError::SerializationError(
                "Invalid file format".to_string(),
            ));
        }
        if self.version != ASSEMBLY_VERSION {
            return Err(FisgraphError::SerializationError(
                "Unsupported file version".to_string(),
            ));
        }
        if self.unit_count > MAX_UNITS as u64 {
            return Err(FisgraphError::SerializationError(format!(
                "Unit count {} exceeds maximum allowed {}",
                self.unit_count, MAX_UNITS
            )));
        }
        Ok(())
    }
}

/// One registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportEntry {
    pub unit: UnitId,
    pub name: OutputName,
    pub value: String,
}

// =============================================================================
// CLOUD ASSEMBLY
// =============================================================================

/// The synthesized resource graph handed to the provisioning engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudAssembly {
    pub account: String,
    pub region: String,
    pub stack_name: String,
    /// Materialized units in deployment order.
    pub order: Vec<UnitId>,
    pub units: Vec<UnitReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<UnitId>,
    /// Registry contents after the run, ordered by unit then name.
    pub exports: Vec<ExportEntry>,
}

impl CloudAssembly {
    /// Assemble the output of a finished run.
    #[must_use]
    pub fn from_deployment(
        context: &DeploymentContext,
        report: &DeploymentReport,
        registry: &Registry,
    ) -> Self {
        Self {
            account: context.account.clone(),
            region: context.region.clone(),
            stack_name: context.stack_name.clone(),
            order: report.completed(),
            units: report.materialized.clone(),
            skipped: report.skipped.clone(),
            exports: registry
                .entries()
                .map(|(key, value)| ExportEntry {
                    unit: key.unit.clone(),
                    name: key.output.clone(),
                    value: value.to_string(),
                })
                .collect(),
        }
    }

    /// Every experiment template in the assembly.
    pub fn templates(&self) -> impl Iterator<Item = &ExperimentTemplate> {
        self.units
            .iter()
            .flat_map(|u| u.resources.iter())
            .filter_map(Resource::as_template)
    }

    /// Rebuild a registry from the recorded exports.
    pub fn to_registry(&self) -> Result<Registry, FisgraphError> {
        let mut registry = Registry::new();
        for entry in &self.exports {
            registry.publish(entry.unit.clone(), entry.name.clone(), entry.value.clone())?;
        }
        Ok(registry)
    }

    /// Deterministic checksum of the body.
    ///
    /// Detects accidental corruption and casual edits. It is not a
    /// cryptographic hash; see `assembly_crypto_hash` for that.
    pub fn checksum(&self) -> Result<u64, FisgraphError> {
        let bytes = serde_json::to_vec(self)
            .map_err(|e| FisgraphError::SerializationError(e.to_string()))?;
        let mut hash: u64 = bytes.len() as u64;
        for byte in &bytes {
            hash = hash.rotate_left(7) ^ u64::from(*byte);
        }
        Ok(hash)
    }
}

#[derive(Serialize, Deserialize)]
struct AssemblyFile {
    header: AssemblyHeader,
    assembly: CloudAssembly,
}

// =============================================================================
// EXPORT / IMPORT
// =============================================================================

/// Render an assembly as pretty JSON with its header.
pub fn export_assembly(assembly: &CloudAssembly) -> Result<String, FisgraphError> {
    let header = AssemblyHeader::new(
        assembly.units.len() as u64,
        assembly.exports.len() as u64,
        assembly.checksum()?,
    );
    let file = AssemblyFile {
        header,
        assembly: assembly.clone(),
    };
    serde_json::to_string_pretty(&file).map_err(|e| FisgraphError::SerializationError(e.to_string()))
}

/// Parse and verify an assembly file.
pub fn import_assembly(data: &str) -> Result<CloudAssembly, FisgraphError> {
    let file: AssemblyFile = serde_json::from_str(data)
        .map_err(|e| FisgraphError::SerializationError(format!("Data: {}", e)))?;

    file.header.validate()?;

    let computed = file.assembly.checksum()?;
    if computed != file.header.checksum {
        return Err(FisgraphError::SerializationError(format!(
            "Checksum mismatch: expected {}, got {}",
            file.header.checksum, computed
        )));
    }
    if file.assembly.units.len() as u64 != file.header.unit_count {
        return Err(FisgraphError::SerializationError(
            "Unit count mismatch".to_string(),
        ));
    }
    if file.assembly.exports.len() as u64 != file.header.export_count {
        return Err(FisgraphError::SerializationError(
            "Export count mismatch".to_string(),
        ));
    }

    Ok(file.assembly)
}

/// Check that `data` is a valid export of exactly `assembly`.
pub fn verify_assembly(assembly: &CloudAssembly, data: &str) -> Result<bool, FisgraphError> {
    let imported = import_assembly(data)?;
    Ok(&imported == assembly)
}

/// BLAKE3 digest of an exported assembly, as 64 hex characters.
#[cfg(feature = "crypto-hash")]
#[must_use]
pub fn assembly_crypto_hash(data: &str) -> String {
    blake3::hash(data.as_bytes()).to_hex().to_string()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{BucketSpec, Resource};
    use crate::ResourceRef;
    use std::collections::BTreeMap;

    fn sample() -> CloudAssembly {
        let mut registry = Registry::new();
        registry
            .publish("FisLogs", "fisS3BucketName", "fis-fislogs-fiss3bucket")
            .expect("publish");

        let mut outputs = BTreeMap::new();
        outputs.insert(
            OutputName::new("fisS3BucketName"),
            "fis-fislogs-fiss3bucket".to_string(),
        );
        let report = DeploymentReport {
            materialized: vec![UnitReport {
                unit: UnitId::new("FisLogs"),
                depends_on: Vec::new(),
                outputs,
                resources: vec![Resource::Bucket(BucketSpec {
                    logical_id: "fisS3Bucket".to_string(),
                    bucket_name: "fis-fislogs-fiss3bucket".to_string(),
                    arn: "arn:aws:s3:::fis-fislogs-fiss3bucket".to_string(),
                })],
            }],
            skipped: Vec::new(),
        };
        CloudAssembly::from_deployment(
            &DeploymentContext::new("123456789012", "us-east-1"),
            &report,
            &registry,
        )
    }

    #[test]
    fn export_then_import_returns_same_assembly() {
        let assembly = sample();
        let data = export_assembly(&assembly).expect("export");
        assert_eq!(import_assembly(&data).expect("import"), assembly);
        assert!(verify_assembly(&assembly, &data).expect("verify"));
    }

    #[test]
    fn export_is_deterministic() {
        let a = export_assembly(&sample()).expect("export");
        let b = export_assembly(&sample()).expect("export");
        assert_eq!(a, b);
    }

    #[test]
    fn edited_value_fails_checksum() {
        let data = export_assembly(&sample()).expect("export");
        let tampered = data.replace("arn:aws:s3:::fis-fislogs-fiss3bucket", "arn:aws:s3:::evil");
        assert_ne!(data, tampered);

        let result = import_assembly(&tampered);
        assert!(matches!(
            result,
            Err(FisgraphError::SerializationError(ref msg)) if msg.contains("Checksum")
        ));
    }

    #[test]
    fn wrong_format_marker_is_rejected() {
        let data = export_assembly(&sample())
            .expect("export")
            .replace(ASSEMBLY_FORMAT, "something-else");
        assert!(matches!(
            import_assembly(&data),
            Err(FisgraphError::SerializationError(ref msg)) if msg == "Invalid file format"
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(import_assembly("").is_err());
        assert!(import_assembly("{\"header\": 1}").is_err());
    }

    #[test]
    fn registry_is_rebuilt_from_exports() {
        let registry = sample().to_registry().expect("registry");
        assert_eq!(
            registry
                .resolve(&ResourceRef::new("FisLogs", "fisS3BucketName"))
                .expect("resolve"),
            "fis-fislogs-fiss3bucket"
        );
    }

    #[cfg(feature = "crypto-hash")]
    #[test]
    fn crypto_hash_is_hex_and_stable() {
        let data = export_assembly(&sample()).expect("export");
        let hash = assembly_crypto_hash(&data);
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, assembly_crypto_hash(&data));
    }
}
