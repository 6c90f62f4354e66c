//! Durable key-value storage seam (`localStorage` in the browser).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::errors::StorageError;

/// String-keyed, string-valued durable storage.
///
/// Methods take `&self`: every host store (localStorage included) is
/// internally mutable and single-threaded.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Rc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// MemoryStore
// ────────────────────────────────────────────────────────────────────────────

/// Process-lifetime store. `disabled()` simulates storage turned off by policy,
/// `read_only()` simulates an exhausted quota.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
    mode: StoreMode,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum StoreMode {
    #[default]
    ReadWrite,
    ReadOnly,
    Disabled,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_only() -> Self {
        Self {
            mode: StoreMode::ReadOnly,
            ..Self::default()
        }
    }

    pub fn disabled() -> Self {
        Self {
            mode: StoreMode::Disabled,
            ..Self::default()
        }
    }

    /// Seeds a raw value regardless of mode.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.mode == StoreMode::Disabled {
            return Err(StorageError::Unavailable("storage disabled".into()));
        }
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        match self.mode {
            StoreMode::Disabled => Err(StorageError::Unavailable("storage disabled".into())),
            StoreMode::ReadOnly => Err(StorageError::QuotaExceeded),
            StoreMode::ReadWrite => {
                self.entries
                    .borrow_mut()
                    .insert(key.to_string(), value.to_string());
                Ok(())
            }
        }
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.mode == StoreMode::Disabled {
            return Err(StorageError::Unavailable("storage disabled".into()));
        }
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// FileStore
// ────────────────────────────────────────────────────────────────────────────

/// JSON-file-backed store for native hosts. The whole map is rewritten on
/// every mutation; an unreadable file starts out empty.
#[cfg(not(target_arch = "wasm32"))]
pub struct FileStore {
    path: std::path::PathBuf,
    data: RefCell<HashMap<String, String>>,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileStore {
    pub fn new(path: std::path::PathBuf) -> Result<Self, StorageError> {
        let data = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            data: RefCell::new(data),
        })
    }

    fn persist(&self, data: &HashMap<String, String>) -> Result<(), StorageError> {
        let serialized = serde_json::to_string_pretty(data)?;
        std::fs::write(&self.path, serialized)?;
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.data.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self.data.borrow_mut();
        guard.insert(key.to_string(), value.to_string());
        self.persist(&guard)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self.data.borrow_mut();
        if guard.remove(key).is_some() {
            self.persist(&guard)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_read_only_store_rejects_writes() {
        let store = MemoryStore::read_only();
        assert!(matches!(
            store.set("k", "v"),
            Err(StorageError::QuotaExceeded)
        ));
        store.insert_raw("k", "seeded");
        assert_eq!(store.get("k").unwrap().as_deref(), Some("seeded"));
    }

    #[test]
    fn test_disabled_store_fails_everything() {
        let store = MemoryStore::disabled();
        assert!(store.get("k").is_err());
        assert!(store.set("k", "v").is_err());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        {
            let store = FileStore::new(path.clone()).unwrap();
            store.set("tier", "{\"tier\":\"Mid\"}").unwrap();
        }
        let reopened = FileStore::new(path).unwrap();
        assert_eq!(
            reopened.get("tier").unwrap().as_deref(),
            Some("{\"tier\":\"Mid\"}")
        );
    }

    #[test]
    fn test_file_store_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "not json").unwrap();
        let store = FileStore::new(path).unwrap();
        assert_eq!(store.get("tier").unwrap(), None);
    }

    #[test]
    fn test_rc_store_shares_state() {
        let shared = Rc::new(MemoryStore::new());
        let handle: Box<dyn KeyValueStore> = Box::new(Rc::clone(&shared));
        handle.set("k", "v").unwrap();
        assert_eq!(shared.raw("k").as_deref(), Some("v"));
    }
}
