//! # redb-backed Export Store
//!
//! Registry entries persisted in a redb embedded database.
//!
//! Keys are `(unit, output)` tuples, values are postcard-encoded
//! `ExportRecord`s. `list` returns records ordered by unit, then output.

use crate::registry::Registry;
use crate::{FisgraphError, OutputName, UnitId};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Table for exports: (unit, output) -> serialized ExportRecord
const EXPORTS: TableDefinition<(&str, &str), &[u8]> = TableDefinition::new("exports");

/// One persisted export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub unit: UnitId,
    pub name: OutputName,
    pub value: String,
}

impl ExportRecord {
    fn key(&self) -> (&str, &str) {
        (self.unit.as_str(), self.name.as_str())
    }
}

/// Disk-backed store of published exports.
pub struct ExportStore {
    db: Database,
}

impl std::fmt::Debug for ExportStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportStore").finish_non_exhaustive()
    }
}

impl ExportStore {
    /// Open or create an export database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FisgraphError> {
        let db =
            Database::create(path.as_ref()).map_err(|e| FisgraphError::IoError(e.to_string()))?;

        {
            let write_txn = db
                .begin_write()
                .map_err(|e| FisgraphError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(EXPORTS)
                .map_err(|e| FisgraphError::IoError(e.to_string()))?;
            write_txn
                .commit()
                .map_err(|e| FisgraphError::IoError(e.to_string()))?;
        }

        Ok(Self { db })
    }

    /// Write every registry entry in one transaction.
    ///
    /// Existing keys are overwritten with the new value. Returns the number
    /// of entries written.
    pub fn persist(&self, registry: &Registry) -> Result<usize, FisgraphError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| FisgraphError::IoError(e.to_string()))?;
        let mut written = 0;
        {
            let mut table = write_txn
                .open_table(EXPORTS)
                .map_err(|e| FisgraphError::IoError(e.to_string()))?;
            for (reference, value) in registry.entries() {
                let record = ExportRecord {
                    unit: reference.unit.clone(),
                    name: reference.output.clone(),
                    value: value.to_string(),
                };
                let bytes = postcard::to_allocvec(&record)
                    .map_err(|e| FisgraphError::SerializationError(e.to_string()))?;
                table
                    .insert(record.key(), bytes.as_slice())
                    .map_err(|e| FisgraphError::IoError(e.to_string()))?;
                written += 1;
            }
        }
        write_txn
            .commit()
            .map_err(|e| FisgraphError::IoError(e.to_string()))?;

        tracing::debug!(entries = written, "exports persisted");
        Ok(written)
    }

    /// All stored exports, ordered by unit then output.
    pub fn list(&self) -> Result<Vec<ExportRecord>, FisgraphError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| FisgraphError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(EXPORTS)
            .map_err(|e| FisgraphError::IoError(e.to_string()))?;

        let mut records = Vec::new();
        for entry in table
            .iter()
            .map_err(|e| FisgraphError::IoError(e.to_string()))?
        {
            let (_, value) = entry.map_err(|e| FisgraphError::IoError(e.to_string()))?;
            let record: ExportRecord = postcard::from_bytes(value.value())
                .map_err(|e| FisgraphError::SerializationError(e.to_string()))?;
            records.push(record);
        }
        Ok(records)
    }

    /// Rebuild a registry from the stored exports.
    pub fn load(&self) -> Result<Registry, FisgraphError> {
        let mut registry = Registry::new();
        for record in self.list()? {
            registry.publish(record.unit, record.name, record.value)?;
        }
        Ok(registry)
    }

    /// Delete every export of `unit`. Returns the number removed.
    pub fn remove_unit(&self, unit: &UnitId) -> Result<usize, FisgraphError> {
        let doomed: Vec<ExportRecord> = self
            .list()?
            .into_iter()
            .filter(|r| &r.unit == unit)
            .collect();

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| FisgraphError::IoError(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(EXPORTS)
                .map_err(|e| FisgraphError::IoError(e.to_string()))?;
            for record in &doomed {
                table
                    .remove(record.key())
                    .map_err(|e| FisgraphError::IoError(e.to_string()))?;
            }
        }
        write_txn
            .commit()
            .map_err(|e| FisgraphError::IoError(e.to_string()))?;
        Ok(doomed.len())
    }

    /// Number of stored exports.
    pub fn len(&self) -> Result<usize, FisgraphError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| FisgraphError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(EXPORTS)
            .map_err(|e| FisgraphError::IoError(e.to_string()))?;
        let count = table
            .len()
            .map_err(|e| FisgraphError::IoError(e.to_string()))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, FisgraphError> {
        Ok(self.len()? == 0)
    }
}

// =============================================================================
// TESTS
// =============================================================================
