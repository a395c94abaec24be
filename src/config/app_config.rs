use serde::Deserialize;

use crate::domain::experiment::PERSIST_KEY;
use crate::domain::DomainError;
use crate::infrastructure::storage::{StoreConfig, StoreType};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where experiment assignments are persisted
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// `memory`, `shared` or `file`
    #[serde(default = "default_backend")]
    pub backend: String,
    /// File path, required by the `file` backend
    #[serde(default = "default_path")]
    pub path: Option<String>,
    #[serde(default = "default_persist_key")]
    pub persist_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_backend() -> String {
    "file".to_string()
}

fn default_path() -> Option<String> {
    Some("experiments.json".to_string())
}

fn default_persist_key() -> String {
    PERSIST_KEY.to_string()
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_path(),
            persist_key: default_persist_key(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

impl StorageSettings {
    /// Resolve the configured backend into a store configuration
    pub fn store_config(&self) -> Result<StoreConfig, DomainError> {
        StoreConfig::from_parts(&self.backend, self.path.as_deref())
    }

    /// Resolve a backend whose contents outlive the process
    ///
    /// `memory` and `shared` stores live inside one process, so editing them
    /// from a one-shot command would be lost on exit.
    pub fn persistent_store_config(&self) -> Result<StoreConfig, DomainError> {
        let store_config = self.store_config()?;

        match store_config.store_type() {
            StoreType::File => Ok(store_config),
            StoreType::InMemory | StoreType::Shared => Err(DomainError::configuration(format!(
                "Storage backend '{}' does not persist between runs; use the 'file' backend",
                self.backend
            ))),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
