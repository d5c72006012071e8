//! Post-checkout reload watcher handler.
//!
//! Fire-and-forget: the VCS has already moved the working tree to another
//! branch, so the store re-reads its model files. No result files are
//! written; consumers observe only that the trigger disappeared. Views
//! obtained before the reload are stale afterwards.

use tracing::info;
use ums_core::trigger::ReloadTriggerFile;
use ums_core::types::ReloadTrigger;
use ums_core::UmsPaths;

use crate::handlers::{lock_store, SharedStore};
use crate::watcher::{HandlerResult, TriggerHandler};

pub struct ReloadHandler {
    store: SharedStore,
    trigger: ReloadTriggerFile,
}

impl ReloadHandler {
    pub fn new(store: SharedStore, paths: &UmsPaths) -> Self {
        Self {
            store,
            trigger: ReloadTriggerFile::new(paths),
        }
    }
}

impl TriggerHandler for ReloadHandler {
    type Trigger = ReloadTrigger;

    fn kind(&self) -> &'static str {
        "reload"
    }

    fn check_and_clear(&self) -> HandlerResult<Option<ReloadTrigger>> {
        Ok(self.trigger.check_and_clear()?)
    }

    fn handle(&self, trigger: ReloadTrigger) -> HandlerResult<()> {
        let mut store = lock_store(&self.store);
        store.reload()?;
        info!(branch = %trigger.branch, generation = store.generation(), "store reloaded after checkout");
        Ok(())
    }
}
