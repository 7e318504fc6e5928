//! Key-value storage for client-local state
//!
//! Mirrors browser local storage: string keys mapped to string values,
//! synchronous access, and persistence across restarts for the file backend.

use crate::error::{CoreError, CoreResult};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Well-known storage keys
pub mod keys {
    pub const ACCESS_TOKEN: &str = "accessToken";
    pub const REFRESH_TOKEN: &str = "refreshToken";
    pub const CART: &str = "cart";
    pub const THEME: &str = "theme";
}

/// Synchronous string key-value store
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> CoreResult<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> CoreResult<()>;

    /// Delete a value; deleting a missing key is not an error
    fn remove(&self, key: &str) -> CoreResult<()>;

    /// Write several values. Backends that can do so apply them in one write.
    fn set_many(&self, entries: &[(&str, &str)]) -> CoreResult<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Delete several values. Backends that can do so apply them in one write.
    fn remove_many(&self, keys: &[&str]) -> CoreResult<()> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }
}

fn poisoned<T>(_: T) -> CoreError {
    CoreError::storage_error("storage lock poisoned")
}

/// In-memory store, used for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> CoreResult<Option<String>> {
        let entries = self.entries.lock().map_err(poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> CoreResult<()> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn set_many(&self, new_entries: &[(&str, &str)]) -> CoreResult<()> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        for (key, value) in new_entries {
            entries.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> CoreResult<()> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

/// JSON-file-backed store
///
/// The whole map is re-read on every access so that several processes
/// sharing one file see each other's writes. Writes go to a temporary file
/// that is renamed over the original.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (or lazily create) a store at `path`
    pub fn open(path: impl Into<PathBuf>) -> CoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> CoreResult<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                CoreError::storage_error(format!(
                    "corrupt store at {}: {e}",
                    self.path.display()
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> CoreResult<()> {
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(map)?)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), entries = map.len(), "Persisted store");
        Ok(())
    }

    fn update<F>(&self, f: F) -> CoreResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self.write_lock.lock().map_err(poisoned)?;
        let mut map = self.read_map()?;
        f(&mut map);
        self.write_map(&map)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> CoreResult<Option<String>> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        self.update(|map| {
            map.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> CoreResult<()> {
        self.update(|map| {
            map.remove(key);
        })
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> CoreResult<()> {
        self.update(|map| {
            for (key, value) in entries {
                map.insert((*key).to_string(), (*value).to_string());
            }
        })
    }

    fn remove_many(&self, keys: &[&str]) -> CoreResult<()> {
        self.update(|map| {
            for key in keys {
                map.remove(*key);
            }
        })
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use mockall::mock;

    mock! {
        pub KeyValueStore {}

        impl KeyValueStore for KeyValueStore {
            fn get(&self, key: &str) -> CoreResult<Option<String>>;
            fn set(&self, key: &str, value: &str) -> CoreResult<()>;
            fn remove(&self, key: &str) -> CoreResult<()>;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get(keys::THEME).unwrap(), None);

        store.set(keys::THEME, "dark").unwrap();
        assert_eq!(store.get(keys::THEME).unwrap().as_deref(), Some("dark"));

        store.remove(keys::THEME).unwrap();
        assert_eq!(store.get(keys::THEME).unwrap(), None);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("storage.json");

        {
            let store = FileStore::open(&path).unwrap();
            store
                .set_many(&[(keys::ACCESS_TOKEN, "a"), (keys::REFRESH_TOKEN, "r")])
                .unwrap();
        }

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get(keys::ACCESS_TOKEN).unwrap().as_deref(), Some("a"));
        assert_eq!(reopened.get(keys::REFRESH_TOKEN).unwrap().as_deref(), Some("r"));

        reopened
            .remove_many(&[keys::ACCESS_TOKEN, keys::REFRESH_TOKEN])
            .unwrap();
        assert_eq!(reopened.get(keys::ACCESS_TOKEN).unwrap(), None);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_file_store_sees_writes_from_other_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        let first = FileStore::open(&path).unwrap();
        let second = FileStore::open(&path).unwrap();

        first.set(keys::REFRESH_TOKEN, "rotated").unwrap();
        assert_eq!(
            second.get(keys::REFRESH_TOKEN).unwrap().as_deref(),
            Some("rotated")
        );
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert!(matches!(
            store.get(keys::CART),
            Err(CoreError::Storage { .. })
        ));
    }

    #[test]
    fn test_default_set_many_goes_through_set() {
        let mut store = mock::MockKeyValueStore::new();
        store.expect_set().times(2).returning(|_, _| Ok(()));

        store
            .set_many(&[(keys::ACCESS_TOKEN, "a"), (keys::REFRESH_TOKEN, "r")])
            .unwrap();
    }
}
