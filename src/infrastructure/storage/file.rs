//! File-backed key-value store

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::debug;

use crate::domain::storage::KeyValueStore;
use crate::domain::DomainError;

/// Key-value store persisted as a JSON object in a single file
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so readers never see a half-written file. A missing file reads as
/// an empty store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Creates a store backed by the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, DomainError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(DomainError::storage(format!(
                    "Failed to read '{}': {}",
                    self.path.display(),
                    e
                )));
            }
        };

        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&raw).map_err(|e| {
            DomainError::storage(format!(
                "Store file '{}' is not a JSON object of strings: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), DomainError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                DomainError::storage(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let data = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");

        fs::write(&tmp, data).map_err(|e| {
            DomainError::storage(format!("Failed to write '{}': {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            DomainError::storage(format!(
                "Failed to replace '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        debug!(path = %self.path.display(), entries = entries.len(), "Store file written");
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), DomainError> {
        let _guard = self.write_lock.lock().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("store.json"));

        assert_eq!(store.get_item("dcl_experiments").unwrap(), None);
    }

    #[test]
    fn test_set_and_get_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        FileStore::new(&path)
            .set_item("dcl_experiments", r#"[["exp","a"]]"#)
            .unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(
            reopened.get_item("dcl_experiments").unwrap(),
            Some(r#"[["exp","a"]]"#.to_string())
        );
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_set_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("store.json"));

        store.set_item("a", "1").unwrap();
        store.set_item("b", "2").unwrap();
        store.set_item("a", "3").unwrap();

        assert_eq!(store.get_item("a").unwrap(), Some("3".to_string()));
        assert_eq!(store.get_item("b").unwrap(), Some("2".to_string()));
    }

    #[test]
    fn test_corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "not json").unwrap();

        let result = FileStore::new(&path).get_item("a");
        assert!(matches!(result, Err(DomainError::Storage { .. })));
    }

    #[test]
    fn test_not_shared() {
        assert!(!FileStore::new("store.json").is_shared());
    }
}
