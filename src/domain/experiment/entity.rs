//! Experiment entity and its lifecycle state machine

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ExperimentError;
use super::event::{ExperimentState, TrackEvent};
use super::random::RandomSource;
use super::validation::{validate_experiment_name, validate_variants, ExperimentValidationError};
use super::variant::{Variant, EMPTY_VARIANT_NAME};
use crate::domain::DomainError;

/// Factory for the state an experiment starts with when activated
pub type InitialStateFn = dyn Fn() -> Result<ExperimentState, ExperimentError> + Send + Sync;

/// Callback invoked for every event while the experiment is running
///
/// The tracker receives the experiment itself so it can record data with
/// [`Experiment::set_state`] and end the experiment with [`Experiment::complete`].
pub type Tracker<V> =
    dyn Fn(&TrackEvent, &mut Experiment<V>) -> Result<(), ExperimentError> + Send + Sync;

// ============================================================================
// ExperimentStatus
// ============================================================================

/// Lifecycle status of an experiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentStatus {
    /// Created but never activated
    #[default]
    Inert,
    /// A variant is assigned and events are tracked
    Active,
    /// Finished; terminal
    Completed,
}

impl ExperimentStatus {
    /// Check if a transition to the target status is valid
    pub fn can_transition_to(&self, target: ExperimentStatus) -> bool {
        match (self, target) {
            (Self::Inert, Self::Active) => true,
            (Self::Inert, Self::Completed) => true,
            (Self::Active, Self::Completed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ExperimentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inert => write!(f, "inert"),
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

// ============================================================================
// Experiment
// ============================================================================

/// A single experiment: its variant catalog, lifecycle and auxiliary state
pub struct Experiment<V> {
    name: String,
    variants: Vec<Arc<Variant<V>>>,
    initial_state: Option<Arc<InitialStateFn>>,
    tracker: Arc<Tracker<V>>,
    empty_variant: Arc<Variant<V>>,
    active: bool,
    completed: bool,
    active_variant: Option<Arc<Variant<V>>>,
    state: Option<ExperimentState>,
}

impl<V> Experiment<V> {
    /// Create an inert experiment with the given tracker
    ///
    /// # Deadlocks
    ///
    /// Inside an [`ExperimentRegistry`](crate::ExperimentRegistry) the tracker
    /// and the initial-state factory run while the registry lock is held.
    /// They must not call back into the same registry, either directly or
    /// through a collaborator that notifies it synchronously, such as an
    /// analytics integration that re-emits tracked events.
    pub fn new<F>(name: impl Into<String>, track: F) -> Self
    where
        F: Fn(&TrackEvent, &mut Experiment<V>) -> Result<(), ExperimentError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            variants: Vec::new(),
            initial_state: None,
            tracker: Arc::new(track),
            empty_variant: Arc::new(Variant::empty()),
            active: false,
            completed: false,
            active_variant: None,
            state: None,
        }
    }

    // Builder methods

    /// Add a variant
    pub fn with_variant(mut self, variant: Variant<V>) -> Self {
        self.variants.push(Arc::new(variant));
        self
    }

    /// Add several variants, keeping their order
    pub fn with_variants(mut self, variants: impl IntoIterator<Item = Variant<V>>) -> Self {
        self.variants.extend(variants.into_iter().map(Arc::new));
        self
    }

    /// Set the factory for the state created on activation
    pub fn with_initial_state<F>(mut self, initial_state: F) -> Self
    where
        F: Fn() -> Result<ExperimentState, ExperimentError> + Send + Sync + 'static,
    {
        self.initial_state = Some(Arc::new(initial_state));
        self
    }

    /// Check the experiment definition
    pub fn validate(&self) -> Result<(), ExperimentValidationError> {
        validate_experiment_name(&self.name)?;
        validate_variants(self.variants.iter().map(|v| (v.name(), v.ratio())))
    }

    // Getters

    /// Name reported to analytics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Payload of the active variant
    pub fn value(&self) -> Option<&V> {
        self.active_variant.as_ref().and_then(|v| v.value())
    }

    /// Active variant, or the empty variant if never activated
    pub fn variant(&self) -> &Arc<Variant<V>> {
        self.active_variant.as_ref().unwrap_or(&self.empty_variant)
    }

    /// Auxiliary state; `None` until the experiment is activated
    pub fn state(&self) -> Option<&ExperimentState> {
        self.state.as_ref()
    }

    /// Deserialize the auxiliary state into a typed value
    pub fn state_as<T: DeserializeOwned>(&self) -> Result<Option<T>, DomainError> {
        match &self.state {
            Some(state) => Ok(Some(serde_json::from_value(Value::Object(state.clone()))?)),
            None => Ok(None),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Lifecycle status derived from the active and completed flags
    pub fn status(&self) -> ExperimentStatus {
        if self.completed {
            ExperimentStatus::Completed
        } else if self.active {
            ExperimentStatus::Active
        } else {
            ExperimentStatus::Inert
        }
    }

    // Variant lookup

    /// Look up a variant by exact name
    ///
    /// The reserved empty-variant name always resolves to the empty variant.
    pub fn variant_named(&self, name: &str) -> Option<Arc<Variant<V>>> {
        if name == EMPTY_VARIANT_NAME {
            return Some(Arc::clone(&self.empty_variant));
        }

        self.variants.iter().find(|v| v.name() == name).cloned()
    }

    /// All configured variants, in declaration order
    pub fn all_variants(&self) -> Vec<Arc<Variant<V>>> {
        self.variants.clone()
    }

    /// Pick a variant by weighted random draw
    ///
    /// Walks the variants in declaration order; the first one whose range
    /// `[offset, offset + ratio)` contains the draw wins. When the ratios sum
    /// below the draw the empty variant is returned.
    pub fn random_variant(&self, rng: &mut dyn RandomSource) -> Arc<Variant<V>> {
        if self.variants.is_empty() {
            return Arc::clone(&self.empty_variant);
        }

        let draw = rng.draw();
        let mut offset = 0.0;

        for variant in &self.variants {
            if draw < variant.ratio() + offset {
                return Arc::clone(variant);
            }
            offset += variant.ratio();
        }

        Arc::clone(&self.empty_variant)
    }

    // Lifecycle

    /// Activate the experiment, optionally forcing a variant by name
    ///
    /// Does nothing when already active or completed. A forced name that
    /// resolves skips the random draw entirely. Errors from the initial-state
    /// factory are returned untouched; the experiment stays inactive.
    pub fn activate(
        &mut self,
        force_variant: Option<&str>,
        rng: &mut dyn RandomSource,
    ) -> Result<(), ExperimentError> {
        if !self.status().can_transition_to(ExperimentStatus::Active) {
            return Ok(());
        }

        let initial_state = match &self.initial_state {
            Some(factory) => factory(),
            None => Ok(ExperimentState::new()),
        };

        let state = match initial_state {
            Ok(state) => state,
            Err(err) => {
                self.state = Some(ExperimentState::new());
                return Err(err);
            }
        };
        self.state = Some(state);

        let variant = force_variant
            .filter(|name| !name.is_empty())
            .and_then(|name| self.variant_named(name))
            .unwrap_or_else(|| self.random_variant(rng));

        self.active = true;
        self.active_variant = Some(variant);

        Ok(())
    }

    /// Shallow-merge a patch into the state
    ///
    /// Only applies while the experiment is active and not completed. Keys
    /// present in the patch overwrite; other keys are kept. Non-object
    /// patches are ignored.
    pub fn set_state(&mut self, patch: impl Into<Value>) {
        if !self.active || self.completed {
            return;
        }

        if let Value::Object(patch) = patch.into() {
            let state = self.state.get_or_insert_with(ExperimentState::new);
            for (key, value) in patch {
                state.insert(key, value);
            }
        }
    }

    /// Mark the experiment as completed
    ///
    /// Allowed from any status; completing twice changes nothing and there
    /// is no way back to active.
    pub fn complete(&mut self) {
        if self.status().can_transition_to(ExperimentStatus::Completed) {
            self.active = false;
            self.completed = true;
        }
    }

    /// Forward an event to the tracker
    ///
    /// Ignored unless the experiment is active and not completed. Tracker
    /// errors are returned to the caller.
    pub fn track(&mut self, event: &TrackEvent) -> Result<(), ExperimentError> {
        if !self.active || self.completed {
            return Ok(());
        }

        let tracker = Arc::clone(&self.tracker);
        tracker(event, self)
    }
}

impl<V> fmt::Debug for Experiment<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Experiment")
            .field("name", &self.name)
            .field("status", &self.status())
            .field("variant", &self.variant().name())
            .field("variants", &self.variants)
            .field("state", &self.state)
            .finish()
    }
}
