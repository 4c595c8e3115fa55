//! File-backed store: one file per key under a data directory

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::KeyValueStore;
use crate::error::{Result, TruthError};

/// Durable store writing each key to `<data_dir>/<key>.json`.
///
/// Writes go to a temporary sibling file which is synced and then renamed over
/// the target, so readers only ever see a complete blob.
#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `data_dir`, creating the directory if needed.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir).map_err(|e| {
            TruthError::Storage(format!(
                "failed to create data directory {}: {}",
                data_dir.display(),
                e
            ))
        })?;
        tracing::debug!(data_dir = %data_dir.display(), "Opened file store");
        Ok(Self { data_dir })
    }

    /// Directory holding the key files
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(TruthError::Storage(format!("invalid store key '{}'", key)));
        }
        Ok(self.data_dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TruthError::Storage(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;
        let tmp_path = self.data_dir.join(format!(".{}.json.tmp", key));

        let result = (|| -> std::io::Result<()> {
            let mut tmp_file = File::create(&tmp_path)?;
            tmp_file.write_all(value.as_bytes())?;
            tmp_file.sync_all()?;
            drop(tmp_file);
            fs::rename(&tmp_path, &path)
        })();

        result.map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            TruthError::Storage(format!("failed to write {}: {}", path.display(), e))
        })
    }
}
