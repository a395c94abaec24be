//! Analytics domain - event stream contract

mod provider;

pub use provider::{Analytics, TrackHandler};

#[cfg(test)]
pub use provider::MockAnalytics;
