//! Domain layer - Core business logic and entities

pub mod analytics;
pub mod error;
pub mod experiment;
pub mod storage;

pub use analytics::{Analytics, TrackHandler};
pub use error::DomainError;
pub use experiment::{
    Experiment, ExperimentError, ExperimentHandle, ExperimentSnapshot, ExperimentState,
    ExperimentStatus, ExperimentValidationError, PersistedAssignments, Properties, RandomSource,
    TrackEvent, Variant, EMPTY_VARIANT_NAME, EXPERIMENT_CONVERSION_EVENT, EXPERIMENT_SHOW_EVENT,
    PERSIST_KEY,
};
pub use storage::{ChangeHandler, KeyValueStore};
