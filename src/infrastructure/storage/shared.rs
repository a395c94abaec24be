//! Shared key-value store with change notifications

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::storage::{ChangeHandler, KeyValueStore};
use crate::domain::DomainError;

#[derive(Default)]
struct SharedInner {
    entries: RwLock<HashMap<String, String>>,
    handlers: RwLock<Vec<ChangeHandler>>,
}

/// Key-value store shared by every clone of the handle
///
/// Each clone behaves like one browser tab looking at the same storage: a
/// write through any handle is visible to all of them and notifies every
/// subscriber, the writer included, synchronously after the write.
#[derive(Clone, Default)]
pub struct SharedStore {
    inner: Arc<SharedInner>,
}

impl SharedStore {
    /// Creates a new empty shared store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active change subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn notify(&self) {
        // Handlers may write back into the store; call them without holding the lock.
        let handlers: Vec<ChangeHandler> = self
            .inner
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for handler in handlers {
            handler();
        }
    }
}

impl fmt::Debug for SharedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedStore")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl KeyValueStore for SharedStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, DomainError> {
        let entries = self.inner.entries.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(entries.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), DomainError> {
        {
            let mut entries = self.inner.entries.write().map_err(|e| {
                DomainError::storage(format!("Failed to acquire write lock: {}", e))
            })?;
            entries.insert(key.to_string(), value.to_string());
        }

        self.notify();
        Ok(())
    }

    fn is_shared(&self) -> bool {
        true
    }

    fn on_change(&self, handler: ChangeHandler) {
        self.inner
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    fn off_change(&self, handler: &ChangeHandler) {
        self.inner
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|h| !Arc::ptr_eq(h, handler));
    }
}
