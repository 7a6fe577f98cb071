//! # redb-backed State Store
//!
//! A disk-backed key/value store using the redb embedded database.
//!
//! Each `set` is its own write transaction, so a crash never leaves a key
//! half-written.

use super::StateStore;
use crate::FusionError;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;

/// Table for planner blobs: store key -> JSON bytes
const KV: TableDefinition<&str, &[u8]> = TableDefinition::new("kv");

/// A disk-backed state store using redb.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FusionError> {
        let db =
            Database::create(path.as_ref()).map_err(|e| FusionError::IoError(e.to_string()))?;

        // Create the table up front so reads never see a missing table.
        {
            let write_txn = db
                .begin_write()
                .map_err(|e| FusionError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(KV)
                .map_err(|e| FusionError::IoError(e.to_string()))?;
            write_txn
                .commit()
                .map_err(|e| FusionError::IoError(e.to_string()))?;
        }

        Ok(Self { db })
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Result<Vec<String>, FusionError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| FusionError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(KV)
            .map_err(|e| FusionError::IoError(e.to_string()))?;

        let mut keys = Vec::new();
        for entry in table
            .iter()
            .map_err(|e| FusionError::IoError(e.to_string()))?
        {
            let (key, _) = entry.map_err(|e| FusionError::IoError(e.to_string()))?;
            keys.push(key.value().to_string());
        }
        Ok(keys)
    }
}

impl StateStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, FusionError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| FusionError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(KV)
            .map_err(|e| FusionError::IoError(e.to_string()))?;

        Ok(table
            .get(key)
            .map_err(|e| FusionError::IoError(e.to_string()))?
            .map(|v| v.value().to_vec()))
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), FusionError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| FusionError::IoError(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(KV)
                .map_err(|e| FusionError::IoError(e.to_string()))?;
            table
                .insert(key, value)
                .map_err(|e| FusionError::IoError(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| FusionError::IoError(e.to_string()))?;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
