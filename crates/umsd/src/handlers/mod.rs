//! The four trigger handlers, one per hook type, each plugged into the
//! shared watcher loop.

pub mod merge;
pub mod post_commit;
pub mod reload;
pub mod validation;

pub use merge::MergeHandler;
pub use post_commit::PostCommitHandler;
pub use reload::ReloadHandler;
pub use validation::ValidationHandler;

use std::sync::{Arc, Mutex, PoisonError};

use crate::store::ModelStore;

/// Process-wide store handle shared by the watchers and the foreground.
pub type SharedStore = Arc<Mutex<ModelStore>>;

/// Lock the store, recovering from a poisoned lock.
///
/// A handler panic must not wedge every later trigger, so the watchers keep
/// going with whatever state the store was left in.
pub(crate) fn lock_store(store: &SharedStore) -> std::sync::MutexGuard<'_, ModelStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}
