//! Infrastructure services

mod experiment_registry;

pub use experiment_registry::{ExperimentRegistry, ExperimentRegistryBuilder};
