//! File-backed key/value storage for values that outlive a session.
//!
//! The store is a single JSON object of string keys to string values. A
//! missing file reads as an empty store.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::utils::{ensure_parent_directory, get_storage_path};

/// Key under which the service credential is persisted.
pub const API_KEY_STORAGE_KEY: &str = "API_KEY";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to determine data directory")]
    NoDataDir,

    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Local storage at {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Persistent string map stored as JSON on disk.
///
/// Every operation reads the file afresh, so several handles on the same
/// path always see each other's writes.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    /// Opens the store at the platform data directory.
    ///
    /// # Errors
    ///
    /// Returns `NoDataDir` if the data directory cannot be determined.
    pub fn open_default() -> Result<Self, StorageError> {
        Ok(Self::at(get_storage_path()?))
    }

    /// Opens the store at an explicit path. Nothing is touched on disk yet.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.remove(key))
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    /// Removes `key`. Returns whether it was present.
    pub fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let mut entries = self.load()?;
        if entries.remove(key).is_none() {
            return Ok(false);
        }
        self.save(&entries)?;
        Ok(true)
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let contents = match fs::read(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };
        if contents.iter().all(u8::is_ascii_whitespace) {
            return Ok(BTreeMap::new());
        }
        serde_json::from_slice(&contents).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        ensure_parent_directory(&self.path)?;

        let json = serde_json::to_vec_pretty(entries).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        // Write beside the target and rename so readers never see half a file.
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, json).map_err(|e| StorageError::io(&staging, e))?;
        fs::rename(&staging, &self.path).map_err(|e| StorageError::io(&self.path, e))?;

        debug!(path = %self.path.display(), entries = entries.len(), "local storage saved");
        Ok(())
    }
}
