//! Experiments engine
//!
//! Client-side experiment assignment and lifecycle:
//! - Weighted variant selection with deterministic overrides
//! - Assignments persisted and reconciled across registries sharing a store
//! - Analytics events driving experiments from "shown" to "converted"
//! - Fault isolation so one broken experiment cannot affect the others

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::{
    Analytics, DomainError, Experiment, ExperimentError, ExperimentSnapshot, ExperimentStatus,
    KeyValueStore, TrackEvent, Variant,
};
pub use infrastructure::services::{ExperimentRegistry, ExperimentRegistryBuilder};
