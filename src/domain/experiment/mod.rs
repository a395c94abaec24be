//! Experiment domain module
//!
//! Variants, the single-experiment state machine and the events that drive
//! it from activation to conversion.

mod assignment;
mod entity;
mod error;
mod event;
mod handle;
pub mod random;
mod validation;
mod variant;

// Re-export all public types
pub use assignment::{PersistedAssignments, PERSIST_KEY};
pub use entity::{Experiment, ExperimentStatus, InitialStateFn, Tracker};
pub use error::ExperimentError;
pub use event::{
    conversion_properties, show_properties, ExperimentState, Properties, TrackEvent,
    ERROR_MESSAGE_KEY, EXPERIMENT_CONVERSION_EVENT, EXPERIMENT_SHOW_EVENT,
};
pub use handle::{ExperimentHandle, ExperimentSnapshot};
pub use random::RandomSource;
pub use validation::ExperimentValidationError;
pub use variant::{Variant, EMPTY_VARIANT_NAME};
