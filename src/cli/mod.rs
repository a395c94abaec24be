//! CLI module for the experiments engine
//!
//! Provides subcommands operating on the configured assignment store:
//! - `show`: list persisted assignments
//! - `set`: pin an experiment to a variant
//! - `clear`: drop every persisted assignment
//! - `assign`: resolve an experiment through the registry

pub mod assign;
pub mod assignments;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::domain::storage::KeyValueStore;
use crate::infrastructure::logging;
use crate::infrastructure::storage::StoreFactory;

/// Experiments engine - inspect and resolve experiment assignments
#[derive(Parser)]
#[command(name = "experiments")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List persisted assignments
    Show(assignments::ShowArgs),

    /// Pin an experiment to a variant
    Set(assignments::SetArgs),

    /// Remove every persisted assignment
    Clear,

    /// Resolve an experiment, assigning a variant on first use
    Assign(assign::AssignArgs),
}

/// Load configuration and install logging
fn init() -> AppConfig {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    logging::init_logging(&config.logging);
    config
}

/// Open the store selected by the configuration
fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    let store_config = config.storage.store_config()?;
    Ok(StoreFactory::create(&store_config))
}

/// Open the configured store, refusing backends that do not outlive the process
fn open_persistent_store(config: &AppConfig) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    let store_config = config.storage.persistent_store_config()?;
    Ok(StoreFactory::create(&store_config))
}
