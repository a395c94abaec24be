//! Analytics events flowing into and out of experiments

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the event reported when a variant is shown
pub const EXPERIMENT_SHOW_EVENT: &str = "experiment_show";

/// Name of the event reported when an experiment completes
pub const EXPERIMENT_CONVERSION_EVENT: &str = "experiment_conversion";

/// State key carrying the message of a failed tracker
pub const ERROR_MESSAGE_KEY: &str = "error_message";

/// Free-form event properties
pub type Properties = Map<String, Value>;

/// Auxiliary per-experiment state, attached to the conversion report
///
/// Kept as a JSON object rather than a type parameter: patches merge key by
/// key, the whole map is spread into `experiment_conversion` properties, and
/// experiments of different payload types share one type-erased handle.
/// Use [`Experiment::state_as`](super::Experiment::state_as) for typed reads.
pub type ExperimentState = Map<String, Value>;

/// A `track` event observed on the analytics stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackEvent {
    /// Event name as reported by the host application
    pub name: String,
    /// Event properties
    #[serde(default)]
    pub properties: Properties,
}

impl TrackEvent {
    /// Create an event without properties
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Properties::new(),
        }
    }

    /// Set the event properties
    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    /// Check the event name
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    /// Get a single property
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// Properties of an `experiment_show` event
pub fn show_properties(experiment: &str, variation: &str) -> Properties {
    let mut properties = Properties::new();
    properties.insert("experiment".to_string(), Value::from(experiment));
    properties.insert("variation".to_string(), Value::from(variation));
    properties
}

/// Properties of an `experiment_conversion` event
///
/// State keys are written last and win over `experiment` and `variation`.
pub fn conversion_properties(
    experiment: &str,
    variation: &str,
    state: Option<&ExperimentState>,
) -> Properties {
    let mut properties = show_properties(experiment, variation);

    if let Some(state) = state {
        for (key, value) in state {
            properties.insert(key.clone(), value.clone());
        }
    }

    properties
}
