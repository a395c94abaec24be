//! In-memory analytics implementation

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::domain::analytics::{Analytics, TrackHandler};
use crate::domain::experiment::Properties;

/// An event reported through [`Analytics::track`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub name: String,
    pub properties: Properties,
}

/// Analytics integration that keeps every reported event in memory
///
/// Like a browser analytics client, each tracked event is also broadcast to
/// the `track` subscribers, synchronously and in subscription order. Useful
/// for testing and for hosts that forward events themselves.
#[derive(Default)]
pub struct InMemoryAnalytics {
    events: RwLock<Vec<RecordedEvent>>,
    handlers: RwLock<Vec<TrackHandler>>,
}

impl InMemoryAnalytics {
    /// Creates a new analytics sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new analytics sink behind an `Arc`
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// All events reported so far, in order
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Reported events with the given name
    pub fn events_named(&self, name: &str) -> Vec<RecordedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.name == name)
            .collect()
    }

    /// Number of active `track` subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Forgets recorded events, keeping subscriptions
    pub fn clear(&self) {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl fmt::Debug for InMemoryAnalytics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryAnalytics")
            .field("events", &self.events())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl Analytics for InMemoryAnalytics {
    fn on_track(&self, handler: TrackHandler) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    fn off_track(&self, handler: &TrackHandler) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|h| !Arc::ptr_eq(h, handler));
    }

    fn track(&self, event_name: &str, properties: Properties) {
        debug!(event = %event_name, "Analytics event tracked");

        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedEvent {
                name: event_name.to_string(),
                properties: properties.clone(),
            });

        let handlers: Vec<TrackHandler> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for handler in handlers {
            handler(event_name, &properties);
        }
    }
}
