//! Post-merge watcher handler.
//!
//! The merge commit already exists when this runs, so the validation is
//! advisory: reload the store over the merged working tree, validate, write
//! the result pair the hook echoes to the developer, and record the permanent
//! merge metadata. The metadata survives result cleanup.

use tracing::{info, warn};
use ums_core::trigger::MergeTriggerFile;
use ums_core::types::MergeTrigger;
use ums_core::{ResultFiles, UmsPaths, ValidationOutcome};

use crate::changelog::MergeMetadata;
use crate::handlers::{lock_store, SharedStore};
use crate::watcher::{HandlerResult, TriggerHandler};

pub struct MergeHandler {
    store: SharedStore,
    trigger: MergeTriggerFile,
    results: ResultFiles,
    paths: UmsPaths,
}

impl MergeHandler {
    pub fn new(store: SharedStore, paths: &UmsPaths) -> Self {
        Self {
            store,
            trigger: MergeTriggerFile::new(paths),
            results: ResultFiles::new(&paths.merge_results_dir),
            paths: paths.clone(),
        }
    }

    /// Reload over the merged tree, then validate. Store failures become a
    /// `Failure` outcome so the result pair is always written.
    fn revalidate(&self) -> ValidationOutcome {
        let mut store = lock_store(&self.store);
        if let Err(e) = store.reload() {
            warn!(error = %e, "reload after merge failed");
            return ValidationOutcome::failure(vec![format!("reload failed: {e}")]);
        }
        match store.validate() {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "validation after merge failed");
                ValidationOutcome::failure(vec![format!("validation failed: {e}")])
            }
        }
    }
}

impl TriggerHandler for MergeHandler {
    type Trigger = MergeTrigger;

    fn kind(&self) -> &'static str {
        "merge"
    }

    fn check_and_clear(&self) -> HandlerResult<Option<MergeTrigger>> {
        Ok(self.trigger.check_and_clear()?)
    }

    fn handle(&self, trigger: MergeTrigger) -> HandlerResult<()> {
        let outcome = self.revalidate();
        self.results.write_result(&outcome, &trigger.request_id)?;

        MergeMetadata::new(
            &trigger.merge_commit_sha,
            &trigger.source_branch,
            &trigger.target_branch,
            outcome.is_valid(),
        )
        .write_to(&self.paths)?;

        info!(
            merge_commit = %trigger.merge_commit_sha,
            source = %trigger.source_branch,
            target = %trigger.target_branch,
            valid = outcome.is_valid(),
            "merge audited"
        );
        Ok(())
    }
}
