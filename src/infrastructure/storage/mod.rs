//! Storage infrastructure - Key-value store implementations

mod factory;
mod file;
mod in_memory;
mod shared;

pub use factory::{StoreConfig, StoreFactory, StoreType};
pub use file::FileStore;
pub use in_memory::InMemoryStore;
pub use shared::SharedStore;
