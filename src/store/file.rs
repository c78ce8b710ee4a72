//! Per-key JSON files with atomic writes.
//!
//! Each key maps to `<dir>/<key>.json`. Writes go temp file → fsync → rename
//! over the target, so a reader never observes a partial value even if the
//! process dies mid-write.

use std::fs::{self, File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::core::errors::{DdsError, Result};

use super::KeyValueStore;

/// Directory-backed store, one file per key.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open (and create) the store directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| DdsError::io(&dir, source))?;
        Ok(Self { dir })
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        // Keys are identifiers like "usageThresholds"; anything that could
        // escape the store directory is rejected.
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(DdsError::Store {
                key: key.to_string(),
                details: "keys must be non-empty [A-Za-z0-9_]".to_string(),
            });
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(DdsError::io(&path, source)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp)
                .map_err(|source| DdsError::io(&tmp, source))?;
            file.write_all(value.as_bytes())
                .map_err(|source| DdsError::io(&tmp, source))?;
            file.sync_all().map_err(|source| DdsError::io(&tmp, source))?;
        }
        fs::rename(&tmp, &path).map_err(|source| DdsError::io(&path, source))?;
        // Best-effort directory sync so the rename itself is durable.
        if let Ok(dir) = File::open(&self.dir) {
            let _ = dir.sync_all();
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(DdsError::io(&path, source)),
        }
    }
}
