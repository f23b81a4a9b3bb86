//! File-backed storage implementation.
//!
//! Persists a flat string map as JSON at a fixed path, created with
//! owner-only permissions on Unix. This matches how the client stores
//! its bearer token on every platform: a small local key-value file,
//! not an OS keychain.

use crate::{SecureStorage, StorageError, StorageResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Storage backend writing to a single JSON file.
pub struct FileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStorage {
    /// Create a file storage backend rooted at `path`.
    ///
    /// The file is created lazily on first write.
    pub fn new(path: &Path) -> StorageResult<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            lock: Mutex::new(()),
        })
    }

    fn read_map(&self) -> StorageResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| StorageError::Encoding(e.to_string()))
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(map)
            .map_err(|e| StorageError::Encoding(e.to_string()))?;
        std::fs::write(&self.path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }
}

impl SecureStorage for FileStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let _guard = self.lock.lock().map_err(|_| {
            StorageError::Platform("storage lock poisoned".to_string())
        })?;
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.lock.lock().map_err(|_| {
            StorageError::Platform("storage lock poisoned".to_string())
        })?;
        Ok(self.read_map()?.get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let _guard = self.lock.lock().map_err(|_| {
            StorageError::Platform("storage lock poisoned".to_string())
        })?;
        let mut map = self.read_map()?;
        let existed = map.remove(key).is_some();
        if existed {
            self.write_map(&map)?;
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_set_get_delete() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(&dir.path().join("credentials.json")).unwrap();

        storage.set("access_token", "tok-123").unwrap();
        assert_eq!(
            storage.get("access_token").unwrap(),
            Some("tok-123".to_string())
        );

        assert!(storage.delete("access_token").unwrap());
        assert!(!storage.delete("access_token").unwrap());
        assert_eq!(storage.get("access_token").unwrap(), None);
    }

    #[test]
    fn test_get_missing_file_returns_none() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(&dir.path().join("nope.json")).unwrap();

        assert_eq!(storage.get("anything").unwrap(), None);
        assert!(!storage.has("anything").unwrap());
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        {
            let storage = FileStorage::new(&path).unwrap();
            storage.set("access_token", "tok-abc").unwrap();
            storage.set("pending_role", "PACIENTE").unwrap();
        }

        let reopened = FileStorage::new(&path).unwrap();
        assert_eq!(
            reopened.get("access_token").unwrap(),
            Some("tok-abc".to_string())
        );
        assert_eq!(
            reopened.get("pending_role").unwrap(),
            Some("PACIENTE".to_string())
        );
    }

    #[test]
    fn test_overwrite_replaces_value() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(&dir.path().join("credentials.json")).unwrap();

        storage.set("access_token", "old").unwrap();
        storage.set("access_token", "new").unwrap();

        assert_eq!(storage.get("access_token").unwrap(), Some("new".to_string()));
    }

    #[test]
    fn test_corrupt_file_is_encoding_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "{not json").unwrap();

        let storage = FileStorage::new(&path).unwrap();
        let err = storage.get("access_token").unwrap_err();
        assert!(matches!(err, StorageError::Encoding(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let storage = FileStorage::new(&path).unwrap();
        storage.set("access_token", "tok").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
