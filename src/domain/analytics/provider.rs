//! Analytics provider trait definition

use std::sync::Arc;

use crate::domain::experiment::Properties;

#[cfg(test)]
use mockall::automock;

/// Callback receiving `(event_name, properties)` for every tracked event
///
/// Handlers are compared by pointer when unsubscribing.
pub type TrackHandler = Arc<dyn Fn(&str, &Properties) + Send + Sync>;

/// Analytics integration: a stream of `track` events plus outbound reporting
#[cfg_attr(test, automock)]
pub trait Analytics: Send + Sync {
    /// Subscribes to the `track` event stream
    fn on_track(&self, handler: TrackHandler);

    /// Removes a subscription made with [`Analytics::on_track`]
    fn off_track(&self, handler: &TrackHandler);

    /// Reports an event
    fn track(&self, event_name: &str, properties: Properties);
}
