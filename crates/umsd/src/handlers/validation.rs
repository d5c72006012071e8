//! Pre-commit validation watcher handler.
//!
//! Validates the store when the pre-commit hook asks, writes the result pair
//! the blocking hook is polling for, and records a provisional changelog for
//! passing validations. The post-commit watcher later writes the
//! authoritative changelog under the real SHA; both records are kept, keyed
//! by their respective SHAs.

use tracing::{info, warn};
use ums_core::trigger::ValidationTriggerFile;
use ums_core::types::ValidationTrigger;
use ums_core::{CoordinationConfig, ResultFiles, UmsPaths, ValidationOutcome};

use crate::changelog::SemanticChangelog;
use crate::handlers::{lock_store, SharedStore};
use crate::watcher::{HandlerResult, TriggerHandler};

pub struct ValidationHandler {
    store: SharedStore,
    trigger: ValidationTriggerFile,
    results: ResultFiles,
    paths: UmsPaths,
    model_extension: String,
}

impl ValidationHandler {
    pub fn new(store: SharedStore, paths: &UmsPaths, config: &CoordinationConfig) -> Self {
        Self {
            store,
            trigger: ValidationTriggerFile::new(paths),
            results: ResultFiles::new(&paths.results_dir),
            paths: paths.clone(),
            model_extension: config.model_extension.clone(),
        }
    }

    /// Run validation, converting a store failure into a `Failure` outcome
    /// naming the error so the blocking hook reports something actionable
    /// instead of timing out.
    fn validate(&self) -> ValidationOutcome {
        let store = lock_store(&self.store);
        match store.validate() {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "validation call failed");
                ValidationOutcome::failure(vec![format!("validation failed: {e}")])
            }
        }
    }
}

impl TriggerHandler for ValidationHandler {
    type Trigger = ValidationTrigger;

    fn kind(&self) -> &'static str {
        "validation"
    }

    fn check_and_clear(&self) -> HandlerResult<Option<ValidationTrigger>> {
        Ok(self.trigger.check_and_clear()?)
    }

    fn handle(&self, trigger: ValidationTrigger) -> HandlerResult<()> {
        let outcome = self.validate();
        self.results.write_result(&outcome, &trigger.request_id)?;
        info!(
            request_id = %trigger.request_id,
            branch = %trigger.branch,
            valid = outcome.is_valid(),
            "validation result written"
        );

        if outcome.is_valid() {
            // Provisional record: the SHA is the hook's guess, not yet git's.
            SemanticChangelog::for_commit(
                &self.paths.root,
                &trigger.commit_sha,
                &trigger.branch,
                &self.model_extension,
            )
            .write_to(&self.paths)?;
        }
        Ok(())
    }
}
