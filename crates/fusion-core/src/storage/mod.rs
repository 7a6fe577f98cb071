//! # Storage Module
//!
//! Key/value persistence for planner state.
//!
//! The planner stores each piece of its state as a JSON blob under a
//! fixed key (see [`crate::primitives`]). Three backends implement
//! [`StateStore`]:
//! - `MemoryStore`: volatile, for tests and throwaway sessions
//! - `FileStore`: the whole map in one file (`"FUSN"` header + postcard)
//! - `RedbStore`: redb embedded database (ACID, crash-safe)

mod redb_store;

pub use redb_store::RedbStore;

use crate::FusionError;
use crate::formats::{store_from_bytes, store_to_bytes};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Persistence port for planner state.
pub trait StateStore {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, FusionError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), FusionError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Volatile in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, FusionError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), FusionError> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

// =============================================================================
// FILE STORE
// =============================================================================

/// Single-file store. The whole map is rewritten on every `set`.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, Vec<u8>>,
}

impl FileStore {
    /// Open a store file, starting empty when it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FusionError> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let bytes = std::fs::read(&path).map_err(|e| FusionError::IoError(e.to_string()))?;
            store_from_bytes(&bytes)?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, entries })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), FusionError> {
        let bytes = store_to_bytes(&self.entries)?;
        std::fs::write(&self.path, bytes).map_err(|e| FusionError::IoError(e.to_string()))
    }
}

impl StateStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, FusionError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), FusionError> {
        let previous = self.entries.insert(key.to_string(), value.to_vec());
        if let Err(e) = self.flush() {
            // Keep memory in step with disk.
            match previous {
                Some(old) => self.entries.insert(key.to_string(), old),
                None => self.entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }
}

// =============================================================================
// BACKEND SELECTION
// =============================================================================

/// Storage backend for a Planner.
#[derive(Debug)]
pub enum StorageBackend {
    /// Volatile in-memory map.
    InMemory(MemoryStore),
    /// Single postcard file.
    File(FileStore),
    /// redb database (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl StorageBackend {
    /// Check if state survives a restart.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        !matches!(self, Self::InMemory(_))
    }

    /// Short backend name for status output.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::InMemory(_) => "memory",
            Self::File(_) => "file",
            Self::Persistent(_) => "redb",
        }
    }
}

impl StateStore for StorageBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, FusionError> {
        match self {
            Self::InMemory(store) => store.get(key),
            Self::File(store) => store.get(key),
            Self::Persistent(store) => store.get(key),
        }
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), FusionError> {
        match self {
            Self::InMemory(store) => store.set(key, value),
            Self::File(store) => store.set(key, value),
            Self::Persistent(store) => store.set(key, value),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        store.set("k", b"v").expect("set");

        assert_eq!(store.get("k").expect("get"), Some(b"v".to_vec()));
        assert_eq!(store.get("missing").expect("get"), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn file_store_survives_reopen() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("fusion.dat");

        {
            let mut store = FileStore::open(&path).expect("open");
            store.set("fts_user_level", b"55").expect("set");
        }

        let store = FileStore::open(&path).expect("reopen");
        assert_eq!(store.get("fts_user_level").expect("get"), Some(b"55".to_vec()));
        assert_eq!(store.path(), path.as_path());
    }

    #[test]
    fn file_store_rejects_foreign_file() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("junk.dat");
        std::fs::write(&path, b"not a store file").expect("write");

        assert!(FileStore::open(&path).is_err());
    }

    #[test]
    fn backend_dispatches() {
        let mut backend = StorageBackend::default();
        assert!(!backend.is_persistent());
        assert_eq!(backend.name(), "memory");

        backend.set("a", b"1").expect("set");
        assert_eq!(backend.get("a").expect("get"), Some(b"1".to_vec()));
    }
}
