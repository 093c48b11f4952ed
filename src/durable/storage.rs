//! Storage backends for the durable cache.
//!
//! A backend is a flat namespace of named slots holding opaque bytes. It is
//! shared by every durable cache pointed at it; slot prefixes keep caches apart.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::NamedTempFile;

use crate::error::StorageError;

/// Trait for durable storage backends.
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Read a slot; `Ok(None)` when it does not exist.
    fn read(&self, slot: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Create or replace a slot.
    fn write(&self, slot: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a slot; returns whether it existed.
    fn remove(&self, slot: &str) -> Result<bool, StorageError>;

    /// Names of every slot currently stored.
    fn slots(&self) -> Result<Vec<String>, StorageError>;
}

// == Memory Storage ==
/// Process-local storage, optionally bounded by a byte quota.
///
/// Clones share the same slots, so several caches can observe each other's
/// writes the way they would through a real persistent store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    /// Creates unbounded storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates storage that rejects writes once slot names plus payloads
    /// would exceed `quota` bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            slots: Arc::default(),
            quota: Some(quota),
        }
    }

    /// Bytes currently used by slot names and payloads.
    pub fn used_bytes(&self) -> usize {
        self.slots
            .lock()
            .iter()
            .map(|(name, data)| name.len() + data.len())
            .sum()
    }
}

impl StorageBackend for MemoryStorage {
    fn read(&self, slot: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.slots.lock().get(slot).cloned())
    }

    fn write(&self, slot: &str, data: &[u8]) -> Result<(), StorageError> {
        let mut slots = self.slots.lock();

        if let Some(quota) = self.quota {
            // The slot being replaced does not count against the new write
            let used: usize = slots
                .iter()
                .filter(|(name, _)| name.as_str() != slot)
                .map(|(name, data)| name.len() + data.len())
                .sum();
            let needed = slot.len() + data.len();
            let available = quota.saturating_sub(used);
            if needed > available {
                return Err(StorageError::QuotaExceeded { needed, available });
            }
        }

        slots.insert(slot.to_string(), data.to_vec());
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<bool, StorageError> {
        Ok(self.slots.lock().remove(slot).is_some())
    }

    fn slots(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.slots.lock().keys().cloned().collect())
    }
}

// == File Storage ==
/// One file per slot inside a directory.
///
/// File names are the hex encoding of the slot name, so any key is safe on
/// any filesystem.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Opens (creating if needed) storage rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Opens storage in the platform cache directory.
    pub fn open_default() -> Result<Self, StorageError> {
        let base = dirs::cache_dir()
            .or_else(|| dirs::home_dir().map(|p| p.join(".cache")))
            .ok_or_else(|| {
                StorageError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    "Could not determine cache directory",
                ))
            })?;

        Self::open(base.join("resilient_cache"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, slot: &str) -> PathBuf {
        self.dir.join(hex::encode(slot))
    }
}

impl StorageBackend for FileStorage {
    fn read(&self, slot: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match fs::read(self.path_for(slot)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, slot: &str, data: &[u8]) -> Result<(), StorageError> {
        // Each writer stages into its own temp file, then renames over the
        // slot so readers never see a half-written one. A failed rename drops
        // the temp file, which deletes it.
        let mut staged = NamedTempFile::new_in(&self.dir)?;
        staged.write_all(data)?;
        staged
            .persist(self.path_for(slot))
            .map_err(|e| StorageError::Io(e.error))?;
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<bool, StorageError> {
        match fs::remove_file(self.path_for(slot)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn slots(&self) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            // Skips temp files and anything not written by this backend
            let decoded = file_name
                .to_str()
                .and_then(|name| hex::decode(name).ok())
                .and_then(|bytes| String::from_utf8(bytes).ok());
            if let Some(name) = decoded {
                names.push(name);
            }
        }
        Ok(names)
    }
}
