//! Infrastructure layer - Store, analytics and randomness implementations

pub mod analytics;
pub mod experiment;
pub mod logging;
pub mod services;
pub mod storage;
