//! Post-commit watcher handler.
//!
//! The pre-commit stage never knows the SHA git will assign, so this handler
//! writes the authoritative changelog once the post-commit hook reports the
//! real one. Needs only the repository, not the store.

use tracing::info;
use ums_core::trigger::PostCommitTriggerFile;
use ums_core::types::PostCommitTrigger;
use ums_core::{CoordinationConfig, UmsPaths};

use crate::changelog::SemanticChangelog;
use crate::watcher::{HandlerResult, TriggerHandler};

pub struct PostCommitHandler {
    trigger: PostCommitTriggerFile,
    paths: UmsPaths,
    model_extension: String,
}

impl PostCommitHandler {
    pub fn new(paths: &UmsPaths, config: &CoordinationConfig) -> Self {
        Self {
            trigger: PostCommitTriggerFile::new(paths),
            paths: paths.clone(),
            model_extension: config.model_extension.clone(),
        }
    }
}

impl TriggerHandler for PostCommitHandler {
    type Trigger = PostCommitTrigger;

    fn kind(&self) -> &'static str {
        "post-commit"
    }

    fn check_and_clear(&self) -> HandlerResult<Option<PostCommitTrigger>> {
        Ok(self.trigger.check_and_clear()?)
    }

    fn handle(&self, trigger: PostCommitTrigger) -> HandlerResult<()> {
        SemanticChangelog::for_commit(
            &self.paths.root,
            &trigger.commit_sha,
            &trigger.branch,
            &self.model_extension,
        )
        .write_to(&self.paths)?;
        info!(
            commit = %trigger.commit_sha,
            branch = %trigger.branch,
            "changelog written for commit"
        );
        Ok(())
    }
}
