//! Experiment registry
//!
//! Resolves and persists variant assignments, fans analytics events out to
//! active experiments and reports `experiment_show` / `experiment_conversion`.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::domain::analytics::{Analytics, TrackHandler};
use crate::domain::experiment::{
    conversion_properties, show_properties, Experiment, ExperimentError, ExperimentHandle,
    ExperimentSnapshot, PersistedAssignments, Properties, RandomSource, TrackEvent,
    ERROR_MESSAGE_KEY, EXPERIMENT_CONVERSION_EVENT, EXPERIMENT_SHOW_EVENT, PERSIST_KEY,
};
use crate::domain::storage::{ChangeHandler, KeyValueStore};
use crate::domain::DomainError;
use crate::infrastructure::experiment::ThreadRandom;
use crate::infrastructure::storage::SharedStore;

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`ExperimentRegistry`]
pub struct ExperimentRegistryBuilder {
    experiments: Vec<(String, Box<dyn ExperimentHandle>)>,
    storage: Option<Arc<dyn KeyValueStore>>,
    analytics: Option<Arc<dyn Analytics>>,
    persist_key: String,
    random: Option<Box<dyn RandomSource>>,
    invalid: Option<DomainError>,
}

impl Default for ExperimentRegistryBuilder {
    fn default() -> Self {
        Self {
            experiments: Vec::new(),
            storage: None,
            analytics: None,
            persist_key: PERSIST_KEY.to_string(),
            random: None,
            invalid: None,
        }
    }
}

impl ExperimentRegistryBuilder {
    /// Register an experiment under an id
    ///
    /// Invalid definitions and duplicate ids are reported by [`build`](Self::build).
    pub fn experiment<V>(mut self, id: impl Into<String>, experiment: Experiment<V>) -> Self
    where
        V: Send + Sync + 'static,
    {
        let id = id.into();

        if self.invalid.is_some() {
            return self;
        }

        if let Err(err) = experiment.validate() {
            self.invalid = Some(DomainError::validation(format!(
                "Experiment '{}' is invalid: {}",
                id, err
            )));
            return self;
        }

        if self.experiments.iter().any(|(existing, _)| existing == &id) {
            self.invalid = Some(DomainError::validation(format!(
                "Experiment '{}' is registered twice",
                id
            )));
            return self;
        }

        self.experiments.push((id, Box::new(experiment)));
        self
    }

    /// Store used to persist assignments, a fresh [`SharedStore`] by default
    pub fn storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Analytics integration used for the event stream and reports
    pub fn analytics(mut self, analytics: Arc<dyn Analytics>) -> Self {
        self.analytics = Some(analytics);
        self
    }

    /// Storage key for persisted assignments
    pub fn persist_key(mut self, key: impl Into<String>) -> Self {
        self.persist_key = key.into();
        self
    }

    /// Source of draws for weighted selection, [`ThreadRandom`] by default
    pub fn random_source(mut self, random: impl RandomSource + 'static) -> Self {
        self.random = Some(Box::new(random));
        self
    }

    /// Load persisted assignments and attach to the collaborators
    pub fn build(self) -> Result<ExperimentRegistry, DomainError> {
        if let Some(err) = self.invalid {
            return Err(err);
        }

        if self.persist_key.trim().is_empty() {
            return Err(DomainError::validation("Persist key cannot be empty"));
        }

        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(SharedStore::new()));
        let storage_shared = storage.is_shared();
        let experiment_count = self.experiments.len();

        let mut order = Vec::with_capacity(experiment_count);
        let mut experiments = HashMap::with_capacity(experiment_count);
        for (id, experiment) in self.experiments {
            order.push(id.clone());
            experiments.insert(id, experiment);
        }

        let shared = Arc::new(RegistryShared {
            state: Mutex::new(RegistryState {
                experiments,
                order,
                active: Vec::new(),
                assignments: PersistedAssignments::new(),
                self_write: false,
                random: self.random.unwrap_or_else(|| Box::new(ThreadRandom)),
            }),
            storage,
            storage_shared,
            analytics: self.analytics,
            persist_key: self.persist_key,
        });

        shared.load_persisted();

        let mut subscriptions = Subscriptions::default();

        match &shared.analytics {
            Some(analytics) => {
                let weak = Arc::downgrade(&shared);
                let handler: TrackHandler = Arc::new(move |name: &str, properties: &Properties| {
                    if let Some(shared) = weak.upgrade() {
                        shared.handle_track_event(name, properties);
                    }
                });
                analytics.on_track(Arc::clone(&handler));
                subscriptions.track = Some(handler);
            }
            None => {
                warn!(
                    "Analytics is not configured; experiments will not report show or conversion events"
                );
            }
        }

        if storage_shared {
            let weak: Weak<RegistryShared> = Arc::downgrade(&shared);
            let handler: ChangeHandler = Arc::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.handle_storage_change();
                }
            });
            shared.storage.on_change(Arc::clone(&handler));
            subscriptions.change = Some(handler);
        }

        info!(
            experiments = experiment_count,
            persist_key = %shared.persist_key,
            shared_storage = storage_shared,
            "Experiment registry ready"
        );

        Ok(ExperimentRegistry {
            shared,
            subscriptions: Mutex::new(subscriptions),
        })
    }
}

impl fmt::Debug for ExperimentRegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&str> = self.experiments.iter().map(|(id, _)| id.as_str()).collect();
        f.debug_struct("ExperimentRegistryBuilder")
            .field("experiments", &ids)
            .field("persist_key", &self.persist_key)
            .field("has_analytics", &self.analytics.is_some())
            .finish()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Orchestrates a fixed set of experiments
///
/// All mutable state sits behind one lock. Writes to storage and outbound
/// analytics events are dispatched after the lock is released, so
/// collaborators may call back into the registry synchronously. Experiment
/// callbacks run under the lock and must not call back into the registry.
///
/// Dropping the registry detaches it from its collaborators.
pub struct ExperimentRegistry {
    shared: Arc<RegistryShared>,
    subscriptions: Mutex<Subscriptions>,
}

#[derive(Default)]
struct Subscriptions {
    track: Option<TrackHandler>,
    change: Option<ChangeHandler>,
}

impl ExperimentRegistry {
    pub fn builder() -> ExperimentRegistryBuilder {
        ExperimentRegistryBuilder::default()
    }

    /// Current value of an experiment, activating it on first read
    ///
    /// Returns `default` when the id is unknown, when the assigned variant has
    /// no payload or when activation failed. A registered experiment whose
    /// payload type is not `V` also yields `default`.
    pub fn get_current_value_for<V>(&self, id: &str, default: V) -> V
    where
        V: Clone + Send + Sync + 'static,
    {
        let mut effects = Vec::new();

        let value = {
            let mut state = self.shared.lock();
            if !state.experiments.contains_key(id) {
                return default;
            }

            state.ensure_active(id, &mut effects);

            let value = state
                .experiments
                .get(id)
                .and_then(|experiment| match experiment.as_any().downcast_ref::<Experiment<V>>() {
                    Some(experiment) => Some(experiment.value().cloned()),
                    None => {
                        warn!(
                            experiment = %id,
                            expected = std::any::type_name::<V>(),
                            "Experiment payload type mismatch, using default"
                        );
                        None
                    }
                });
            value.flatten()
        };

        self.shared.dispatch(effects);
        value.unwrap_or(default)
    }

    /// Every payload configured for an experiment, in declaration order
    pub fn get_all_values_for<V>(&self, id: &str) -> Vec<V>
    where
        V: Clone + Send + Sync + 'static,
    {
        self.with_experiment::<V, _>(id, |experiment| {
            experiment
                .all_variants()
                .iter()
                .filter_map(|variant| variant.value().cloned())
                .collect()
        })
        .unwrap_or_default()
    }

    /// Snapshot of a registered experiment
    pub fn get_experiment(&self, id: &str) -> Option<ExperimentSnapshot> {
        self.shared
            .lock()
            .experiments
            .get(id)
            .map(|experiment| experiment.snapshot())
    }

    /// Run `f` against a registered experiment of payload type `V`
    pub fn with_experiment<V, R>(&self, id: &str, f: impl FnOnce(&Experiment<V>) -> R) -> Option<R>
    where
        V: Send + Sync + 'static,
    {
        let state = self.shared.lock();
        state
            .experiments
            .get(id)
            .and_then(|experiment| experiment.as_any().downcast_ref::<Experiment<V>>())
            .map(f)
    }

    /// Ids of registered experiments, in registration order
    pub fn experiment_ids(&self) -> Vec<String> {
        self.shared.lock().order.clone()
    }

    /// Ids of active experiments, in activation order
    pub fn active_experiments(&self) -> Vec<String> {
        self.shared.lock().active.clone()
    }

    /// Known assignments as `(experiment, variant)` pairs
    pub fn persisted_assignments(&self) -> Vec<(String, String)> {
        self.shared.lock().assignments.entries().to_vec()
    }

    /// Forward a `track` event to every active experiment
    pub fn handle_track_event(&self, name: &str, properties: &Properties) {
        self.shared.handle_track_event(name, properties);
    }

    /// Forward an event to every active experiment
    pub fn emit(&self, event: &TrackEvent) {
        self.shared.emit(event);
    }

    /// React to a change of the persisted assignments made elsewhere
    pub fn handle_storage_change(&self) {
        self.shared.handle_storage_change();
    }

    /// Reload persisted assignments, merging them into memory
    pub fn load_persisted(&self) {
        self.shared.load_persisted();
    }

    /// Unsubscribe from analytics and storage notifications
    ///
    /// Safe to call more than once.
    pub fn detach(&self) {
        let (track, change) = {
            let mut subscriptions = self
                .subscriptions
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            (subscriptions.track.take(), subscriptions.change.take())
        };

        if let (Some(handler), Some(analytics)) = (track, &self.shared.analytics) {
            analytics.off_track(&handler);
            debug!("Detached from analytics");
        }

        if let Some(handler) = change {
            self.shared.storage.off_change(&handler);
            debug!("Detached from storage notifications");
        }
    }
}

impl Drop for ExperimentRegistry {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for ExperimentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("ExperimentRegistry")
            .field("experiments", &state.order)
            .field("active", &state.active)
            .field("assignments", &state.assignments)
            .field("persist_key", &self.shared.persist_key)
            .finish()
    }
}

// ============================================================================
// Shared internals
// ============================================================================

struct RegistryShared {
    state: Mutex<RegistryState>,
    storage: Arc<dyn KeyValueStore>,
    storage_shared: bool,
    analytics: Option<Arc<dyn Analytics>>,
    persist_key: String,
}

struct RegistryState {
    experiments: HashMap<String, Box<dyn ExperimentHandle>>,
    order: Vec<String>,
    active: Vec<String>,
    assignments: PersistedAssignments,
    /// Set right before this registry writes a shared store
    self_write: bool,
    random: Box<dyn RandomSource>,
}

/// Side effect collected under the lock, dispatched after release
enum Effect {
    Persist(String),
    Track {
        name: &'static str,
        properties: Properties,
    },
}

impl RegistryShared {
    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle_track_event(&self, name: &str, properties: &Properties) {
        let event = TrackEvent::new(name).with_properties(properties.clone());
        self.emit(&event);
    }

    fn emit(&self, event: &TrackEvent) {
        let mut effects = Vec::new();
        self.lock().emit(event, &mut effects);
        self.dispatch(effects);
    }

    fn handle_storage_change(&self) {
        let mut state = self.lock();
        if state.self_write {
            state.self_write = false;
            debug!("Ignoring storage change caused by own write");
        } else {
            debug!("Persisted experiments changed externally, reloading");
            state.load_persisted(self.storage.as_ref(), &self.persist_key);
        }
    }

    fn load_persisted(&self) {
        self.lock()
            .load_persisted(self.storage.as_ref(), &self.persist_key);
    }

    fn dispatch(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Persist(serialized) => {
                    if self.storage_shared {
                        self.lock().self_write = true;
                    }

                    if let Err(err) = self.storage.set_item(&self.persist_key, &serialized) {
                        if self.storage_shared {
                            self.lock().self_write = false;
                        }
                        error!(
                            error = %err,
                            key = %self.persist_key,
                            "Failed to persist experiment assignments"
                        );
                    }
                }
                Effect::Track { name, properties } => {
                    if let Some(analytics) = &self.analytics {
                        analytics.track(name, properties);
                    }
                }
            }
        }
    }
}

impl RegistryState {
    fn load_persisted(&mut self, storage: &dyn KeyValueStore, key: &str) {
        let raw = match storage.get_item(key) {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => return,
            Err(err) => {
                error!(error = %err, key = %key, "Persisted experiments cannot be read");
                return;
            }
        };

        match self.assignments.merge_raw(&raw) {
            Ok(merged) => debug!(merged, "Loaded persisted experiments"),
            Err(err) => error!(error = %err, raw = %raw, "Persisted experiments cannot be loaded"),
        }
    }

    fn ensure_active(&mut self, id: &str, effects: &mut Vec<Effect>) {
        let Some(experiment) = self.experiments.get_mut(id) else {
            return;
        };

        if experiment.is_active() {
            return;
        }

        let hint = self.assignments.get(experiment.name()).map(str::to_string);
        let random = &mut self.random;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            experiment.activate(hint.as_deref(), random.as_mut())
        }))
        .unwrap_or_else(|payload| Err(ExperimentError::from_panic(&*payload)));

        if let Err(err) = outcome {
            experiment.complete();
            error!(
                experiment = %experiment.name(),
                error = %err,
                snapshot = ?experiment.snapshot(),
                "Experiment activation failed"
            );
            return;
        }

        if !experiment.is_active() {
            return;
        }

        let name = experiment.name().to_string();
        let variant = experiment.variant_name().to_string();
        let shown = !experiment.is_empty_variant();

        debug!(experiment = %name, variant = %variant, "Experiment activated");

        if self.assignments.set(&name, &variant) {
            match self.assignments.to_json() {
                Ok(serialized) => effects.push(Effect::Persist(serialized)),
                Err(err) => error!(error = %err, "Failed to serialize experiment assignments"),
            }
        }

        if !self.active.iter().any(|active| active == id) {
            self.active.push(id.to_string());
        }

        if shown {
            effects.push(Effect::Track {
                name: EXPERIMENT_SHOW_EVENT,
                properties: show_properties(&name, &variant),
            });
        }
    }

    fn emit(&mut self, event: &TrackEvent, effects: &mut Vec<Effect>) {
        for id in self.active.clone() {
            let Some(experiment) = self.experiments.get_mut(&id) else {
                continue;
            };

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| experiment.track(event)))
                .unwrap_or_else(|payload| Err(ExperimentError::from_panic(&*payload)));

            if let Err(err) = outcome {
                let mut patch = Map::new();
                patch.insert(ERROR_MESSAGE_KEY.to_string(), Value::from(err.message()));
                experiment.set_state(Value::Object(patch));
                experiment.complete();
                error!(
                    experiment = %experiment.name(),
                    event = %event.name,
                    error = %err,
                    snapshot = ?experiment.snapshot(),
                    "Experiment tracking failed"
                );
            }

            if experiment.is_completed() {
                let properties = conversion_properties(
                    experiment.name(),
                    experiment.variant_name(),
                    experiment.state(),
                );
                info!(experiment = %experiment.name(), "Experiment converted");

                self.active.retain(|active| active != &id);
                effects.push(Effect::Track {
                    name: EXPERIMENT_CONVERSION_EVENT,
                    properties,
                });
            }
        }
    }
}
