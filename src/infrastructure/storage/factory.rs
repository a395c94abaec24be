//! Store factory for runtime store selection

use std::path::PathBuf;
use std::sync::Arc;

use crate::domain::storage::KeyValueStore;
use crate::domain::DomainError;

use super::file::FileStore;
use super::in_memory::InMemoryStore;
use super::shared::SharedStore;

/// Supported store types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreType {
    /// Process-local store without notifications
    InMemory,
    /// Store shared between registries, with change notifications
    Shared,
    /// JSON file on disk
    File,
}

impl StoreType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Some(Self::InMemory),
            "shared" | "local" | "local-storage" | "local_storage" => Some(Self::Shared),
            "file" | "disk" => Some(Self::File),
            _ => None,
        }
    }
}

/// Store configuration
#[derive(Debug, Clone)]
pub enum StoreConfig {
    InMemory,
    Shared,
    File(PathBuf),
}

impl StoreConfig {
    /// Builds a configuration from a backend name and an optional file path
    pub fn from_parts(backend: &str, path: Option<&str>) -> Result<Self, DomainError> {
        let store_type = StoreType::from_str(backend).ok_or_else(|| {
            DomainError::configuration(format!("Unknown storage backend '{}'", backend))
        })?;

        match store_type {
            StoreType::InMemory => Ok(Self::InMemory),
            StoreType::Shared => Ok(Self::Shared),
            StoreType::File => {
                let path = path.filter(|p| !p.trim().is_empty()).ok_or_else(|| {
                    DomainError::configuration("File storage requires a path")
                })?;
                Ok(Self::File(PathBuf::from(path)))
            }
        }
    }

    /// Returns the store type
    pub fn store_type(&self) -> StoreType {
        match self {
            Self::InMemory => StoreType::InMemory,
            Self::Shared => StoreType::Shared,
            Self::File(_) => StoreType::File,
        }
    }
}

/// Factory for creating key-value stores
#[derive(Debug)]
pub struct StoreFactory;

impl StoreFactory {
    /// Creates a store based on the configuration
    pub fn create(config: &StoreConfig) -> Arc<dyn KeyValueStore> {
        match config {
            StoreConfig::InMemory => Arc::new(InMemoryStore::new()),
            StoreConfig::Shared => Arc::new(SharedStore::new()),
            StoreConfig::File(path) => Arc::new(FileStore::new(path.clone())),
        }
    }
}
