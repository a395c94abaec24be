//! Storage domain - key-value persistence contract

mod store;

pub use store::{ChangeHandler, KeyValueStore};

#[cfg(test)]
pub use store::MockKeyValueStore;
