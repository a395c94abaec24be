//! In-memory key-value store

use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::storage::KeyValueStore;
use crate::domain::DomainError;

/// Process-local key-value store
///
/// Not shared with anyone else, so it never emits change notifications.
/// Data is lost when the process terminates.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryStore {
    /// Creates a new empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, DomainError> {
        let entries = self.entries.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(entries.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), DomainError> {
        let mut entries = self.entries.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_key() {
        let store = InMemoryStore::new();
        assert_eq!(store.get_item("dcl_experiments").unwrap(), None);
    }

    #[test]
    fn test_set_and_get() {
        let store = InMemoryStore::new();
        store.set_item("key", "value").unwrap();
        assert_eq!(store.get_item("key").unwrap(), Some("value".to_string()));

        store.set_item("key", "other").unwrap();
        assert_eq!(store.get_item("key").unwrap(), Some("other".to_string()));
    }

    #[test]
    fn test_keys_are_independent() {
        let store = InMemoryStore::new();
        store.set_item("a", "1").unwrap();
        store.set_item("b", "2").unwrap();
        assert_eq!(store.get_item("a").unwrap(), Some("1".to_string()));
        assert_eq!(store.get_item("b").unwrap(), Some("2".to_string()));
    }

    #[test]
    fn test_not_shared() {
        let store = InMemoryStore::new();
        assert!(!store.is_shared());
    }
}
