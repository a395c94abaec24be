//! Key-value store trait definition

use std::sync::Arc;

use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Callback fired when a shared store changes
///
/// Handlers are compared by pointer, so the same `Arc` passed to
/// [`KeyValueStore::on_change`] must be passed to [`KeyValueStore::off_change`].
pub type ChangeHandler = Arc<dyn Fn() + Send + Sync>;

/// String key-value store used to persist assignments
///
/// Shared stores are visible to several registries at once (the way browser
/// storage is shared by tabs) and announce every write to their subscribers.
/// Notifications carry no payload; subscribers re-read the keys they care
/// about.
#[cfg_attr(test, automock)]
pub trait KeyValueStore: Send + Sync {
    /// Reads a value
    fn get_item(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Writes a value
    fn set_item(&self, key: &str, value: &str) -> Result<(), DomainError>;

    /// Whether other processes observe this store and it emits change notifications
    fn is_shared(&self) -> bool {
        false
    }

    /// Subscribes to change notifications
    fn on_change(&self, _handler: ChangeHandler) {}

    /// Removes a subscription made with [`KeyValueStore::on_change`]
    fn off_change(&self, _handler: &ChangeHandler) {}
}
