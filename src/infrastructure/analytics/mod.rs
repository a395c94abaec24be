//! Analytics infrastructure - Analytics implementations

mod in_memory;

pub use in_memory::{InMemoryAnalytics, RecordedEvent};
