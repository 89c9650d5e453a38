//! Dataset stores: JSON files on disk and an in-memory map.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Error as IoError, ErrorKind, Write as _};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::model::{DatasetId, DatasetPayload};
use crate::ports::{DatasetStore, StorageError};

/// Stores each dataset as `<id>.json` plus `<id>.fallback.json` under one directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`. The directory is created on first write.
    #[must_use]
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the dataset files.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the primary copy.
    #[must_use]
    pub fn primary_path(&self, dataset_id: &DatasetId) -> PathBuf {
        self.root.join(format!("{dataset_id}.json"))
    }

    /// Location of the fallback copy.
    #[must_use]
    pub fn fallback_path(&self, dataset_id: &DatasetId) -> PathBuf {
        self.root.join(format!("{dataset_id}.fallback.json"))
    }

    /// Read the primary copy, `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the file cannot be read or parsed.
    pub fn read_payload(&self, dataset_id: &DatasetId) -> Result<Option<DatasetPayload>, StorageError> {
        read_at(&self.primary_path(dataset_id))
    }
}

impl DatasetStore for FileStore {
    fn write(&self, dataset_id: &DatasetId, payload: &DatasetPayload) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root).map_err(|source| StorageError::Io {
            path: self.root.clone(),
            source,
        })?;

        let bytes = serde_json::to_vec_pretty(payload)?;

        write_atomic(&self.primary_path(dataset_id), &bytes)?;
        write_atomic(&self.fallback_path(dataset_id), &bytes)?;

        log::debug!(
            "Wrote {} records for {dataset_id} to {}",
            payload.records.len(),
            self.root.display()
        );
        Ok(())
    }

    fn read_fallback(&self, dataset_id: &DatasetId) -> Result<Option<DatasetPayload>, StorageError> {
        read_at(&self.fallback_path(dataset_id))
    }
}

fn read_at(path: &Path) -> Result<Option<DatasetPayload>, StorageError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StorageError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

// Temp file + rename, so a crash mid-write leaves the previous copy intact.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let tmp_path = path.with_extension("json.tmp");
    let io_err = |source: IoError| StorageError::Io {
        path: tmp_path.clone(),
        source,
    };

    {
        let mut file = File::create(&tmp_path).map_err(io_err)?;
        file.write_all(bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
    }

    fs::rename(&tmp_path, path).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Default)]
struct Copies {
    primary: HashMap<DatasetId, DatasetPayload>,
    fallback: HashMap<DatasetId, DatasetPayload>,
}

/// Keeps datasets in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    copies: Mutex<Copies>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Primary copy of `dataset_id`, if one was written.
    #[must_use]
    pub fn primary(&self, dataset_id: &DatasetId) -> Option<DatasetPayload> {
        self.copies
            .lock()
            .ok()
            .and_then(|copies| copies.primary.get(dataset_id).cloned())
    }

    /// Install a fallback copy directly, as left behind by an earlier run.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] when the lock is poisoned.
    pub fn seed_fallback(&self, payload: DatasetPayload) -> Result<(), StorageError> {
        let mut copies = self.lock()?;
        copies.fallback.insert(payload.dataset_id.clone(), payload);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Copies>, StorageError> {
        self.copies
            .lock()
            .map_err(|err| StorageError::Unavailable(err.to_string()))
    }
}

impl DatasetStore for MemoryStore {
    fn write(&self, dataset_id: &DatasetId, payload: &DatasetPayload) -> Result<(), StorageError> {
        let mut copies = self.lock()?;
        copies.primary.insert(dataset_id.clone(), payload.clone());
        copies.fallback.insert(dataset_id.clone(), payload.clone());
        Ok(())
    }

    fn read_fallback(&self, dataset_id: &DatasetId) -> Result<Option<DatasetPayload>, StorageError> {
        Ok(self.lock()?.fallback.get(dataset_id).cloned())
    }
}
