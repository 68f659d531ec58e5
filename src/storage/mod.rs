//! Durable registration and statistics stores
//!
//! Both stores follow the same discipline: load the whole file at startup,
//! mutate in memory, and rewrite the whole file on every save. The last
//! writer wins; there is no fine-grained locking.
//!
//! Writes go to a temporary sibling first and are renamed into place so a
//! crash mid-write never leaves a truncated store behind.
//!
//! # Example
//!
//! ```no_run
//! use niward::storage::JsonFileStore;
//! use niward::storage::Registrations;
//!
//! # fn example() -> Result<(), niward::storage::StorageError> {
//! let store = JsonFileStore::new("data/servers.json");
//! let mut registrations: Registrations = store.load_or_default();
//! // ... mutate ...
//! store.save(&registrations)?;
//! # Ok(())
//! # }
//! ```

use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::Registration;

/// Owner id → registration
pub type Registrations = BTreeMap<String, Registration>;

/// Errors raised while reading or writing a store file
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed store file {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn serialization(path: &Path, source: serde_json::Error) -> Self {
        Self::Serialization {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A JSON document persisted as a single file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole document
    ///
    /// A missing file is a first run and yields `Ok(None)`.
    pub fn load<T: DeserializeOwned>(&self) -> Result<Option<T>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let file = File::open(&self.path).map_err(|e| StorageError::io(&self.path, e))?;
        let reader = BufReader::new(file);
        let value = serde_json::from_reader(reader)
            .map_err(|e| StorageError::serialization(&self.path, e))?;

        tracing::debug!(path = %self.path.display(), "Store loaded");
        Ok(Some(value))
    }

    /// Read the document, treating any failure as an empty store
    pub fn load_or_default<T: DeserializeOwned + Default>(&self) -> T {
        match self.load() {
            Ok(Some(value)) => value,
            Ok(None) => {
                tracing::info!(path = %self.path.display(), "No store file yet, starting empty");
                T::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load store, starting empty");
                T::default()
            }
        }
    }

    /// Rewrite the whole document
    pub fn save<T: Serialize>(&self, value: &T) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }

        let mut temp_name = self.path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        let file = File::create(&temp_path).map_err(|e| StorageError::io(&temp_path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)
            .map_err(|e| StorageError::serialization(&temp_path, e))?;
        writer
            .flush()
            .map_err(|e| StorageError::io(&temp_path, e))?;

        fs::rename(&temp_path, &self.path).map_err(|e| StorageError::io(&self.path, e))?;

        tracing::debug!(path = %self.path.display(), "Store saved");
        Ok(())
    }
}
