use crate::common::{default_data_dir, CaptureError, DevMode, Result};
use crate::storage::ImageStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const STORAGE_VERSION: u32 = 1;
const STORE_FILE: &str = "store.bincode";

#[derive(Serialize, Deserialize, Default)]
struct StoreData {
    version: u32,
    entries: BTreeMap<String, String>,
}

/// Key-value store persisted to a single bincode file, so separate
/// invocations (capture, then login) see the same entries.
pub struct FileStore {
    path: PathBuf,
    data: StoreData,
}

impl FileStore {
    pub fn new_with_dir(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(STORE_FILE);

        let data = if path.exists() {
            let bytes = fs::read(&path)?;
            let mut data: StoreData = bincode::deserialize(&bytes)
                .map_err(|e| CaptureError::Storage(format!("Failed to deserialize {}: {}", path.display(), e)))?;

            if data.version > STORAGE_VERSION {
                return Err(CaptureError::Storage(format!(
                    "{} was written by a newer version (format {}, supported {})",
                    path.display(), data.version, STORAGE_VERSION
                )));
            }
            data.version = STORAGE_VERSION;
            data
        } else {
            StoreData { version: STORAGE_VERSION, entries: BTreeMap::new() }
        };

        tracing::debug!("FileStore at {} with {} entries", path.display(), data.entries.len());
        Ok(Self { path, data })
    }

    /// Explicit directory first, then the dev directory, then the platform
    /// data directory.
    pub fn new_with_dev_mode(configured: Option<&Path>, dev_mode: &DevMode) -> Result<Self> {
        let data_dir = match (configured, dev_mode.store_dir()) {
            (Some(dir), _) => dir.to_path_buf(),
            (None, Some(dir)) => dir,
            (None, None) => default_data_dir()
                .ok_or_else(|| CaptureError::Storage("Failed to get project dirs".into()))?,
        };
        Self::new_with_dir(&data_dir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        let encoded = bincode::serialize(&self.data)
            .map_err(|e| CaptureError::Storage(format!("Failed to serialize: {}", e)))?;

        let temp_path = self.path.with_extension("part");
        fs::write(&temp_path, encoded)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl ImageStore for FileStore {
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let previous = self.data.entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush() {
            // Keep memory consistent with disk
            match previous {
                Some(old) => self.data.entries.insert(key.to_string(), old),
                None => self.data.entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.entries.get(key).cloned())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if let Some(old) = self.data.entries.remove(key) {
            if let Err(e) = self.flush() {
                self.data.entries.insert(key.to_string(), old);
                return Err(e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = FileStore::new_with_dir(dir.path()).unwrap();
            store.set("image", "data:image/png;base64,AAAA").unwrap();
        }

        let store = FileStore::new_with_dir(dir.path()).unwrap();
        assert_eq!(store.get("image").unwrap().as_deref(), Some("data:image/png;base64,AAAA"));
    }

    #[test]
    fn test_set_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new_with_dir(dir.path()).unwrap();
        store.set("image", "first").unwrap();
        store.set("image", "second").unwrap();

        let reopened = FileStore::new_with_dir(dir.path()).unwrap();
        assert_eq!(reopened.get("image").unwrap().as_deref(), Some("second"));
        assert_eq!(reopened.data.entries.len(), 1);
    }

    #[test]
    fn test_remove_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new_with_dir(dir.path()).unwrap();
        store.set("image", "value").unwrap();
        store.remove("image").unwrap();
        store.remove("image").unwrap();

        let reopened = FileStore::new_with_dir(dir.path()).unwrap();
        assert!(reopened.get("image").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(STORE_FILE), b"\xff\xff\xff\xff\xff\xff\xff\xff\xff").unwrap();
        assert!(matches!(
            FileStore::new_with_dir(dir.path()),
            Err(CaptureError::Storage(_))
        ));
    }

    #[test]
    fn test_newer_format_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let future = StoreData { version: STORAGE_VERSION + 98, entries: BTreeMap::new() };
        fs::write(dir.path().join(STORE_FILE), bincode::serialize(&future).unwrap()).unwrap();

        assert!(matches!(
            FileStore::new_with_dir(dir.path()),
            Err(CaptureError::Storage(_))
        ));
        // The newer file is left untouched
        let bytes = fs::read(dir.path().join(STORE_FILE)).unwrap();
        let on_disk: StoreData = bincode::deserialize(&bytes).unwrap();
        assert_eq!(on_disk.version, STORAGE_VERSION + 98);
    }

    /// A directory in place of the store file makes the final rename fail.
    fn block_store_file(store: &FileStore) {
        fs::remove_file(store.path()).unwrap();
        fs::create_dir(store.path()).unwrap();
        fs::write(store.path().join("occupied"), b"x").unwrap();
    }

    #[test]
    fn test_failed_remove_keeps_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new_with_dir(dir.path()).unwrap();
        store.set("image", "value").unwrap();
        block_store_file(&store);

        assert!(store.remove("image").is_err());
        assert_eq!(store.get("image").unwrap().as_deref(), Some("value"));
    }

    #[test]
    fn test_failed_set_restores_previous() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new_with_dir(dir.path()).unwrap();
        store.set("image", "old").unwrap();
        block_store_file(&store);

        assert!(store.set("image", "new").is_err());
        assert!(store.set("other", "value").is_err());
        assert_eq!(store.get("image").unwrap().as_deref(), Some("old"));
        assert!(store.get("other").unwrap().is_none());
    }

    #[test]
    fn test_configured_dir_wins_over_dev_mode() {
        let dir = tempfile::tempdir().unwrap();
        let dev = DevMode::with_base_dir(true, dir.path().join("dev")).unwrap();
        let configured = dir.path().join("configured");

        let store = FileStore::new_with_dev_mode(Some(&configured), &dev).unwrap();
        assert_eq!(store.path(), configured.join(STORE_FILE));
    }
}
