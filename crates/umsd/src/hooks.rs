//! Git hook installer.
//!
//! Writes four executable sh scripts into the repository's hook directory.
//! The scripts are the out-of-process half of the coordination protocol: they
//! write trigger files atomically (temp sibling + `mv`) and, for the blocking
//! pre-commit hook, poll the result directory and turn the outcome into an
//! exit code.

use std::path::PathBuf;

use thiserror::Error;
use tracing::info;
use ums_core::{CoordinationConfig, HookKind};

use crate::git::{self, GitError};

#[derive(Debug, Error)]
pub enum HookError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Git(#[from] GitError),
}

pub type Result<T> = std::result::Result<T, HookError>;

pub struct HookInstaller {
    hooks_dir: PathBuf,
    hook_timeout_secs: u32,
    fail_open: bool,
}

impl HookInstaller {
    /// Resolve the hook directory for the repository at `repo_root`.
    pub fn new(repo_root: &std::path::Path, config: &CoordinationConfig) -> Result<Self> {
        Ok(Self {
            hooks_dir: git::hooks_dir(repo_root)?,
            hook_timeout_secs: config.hook_timeout_secs,
            fail_open: config.fail_open,
        })
    }

    pub fn hook_path(&self, kind: HookKind) -> PathBuf {
        self.hooks_dir.join(kind.as_str())
    }

    /// Install one hook script, overwriting any previous version.
    pub fn install(&self, kind: HookKind) -> Result<()> {
        std::fs::create_dir_all(&self.hooks_dir)?;
        let path = self.hook_path(kind);
        std::fs::write(&path, self.script_for(kind))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
        }
        info!(hook = kind.as_str(), path = %path.display(), "hook installed");
        Ok(())
    }

    /// Install all four hooks.
    pub fn install_all(&self) -> Result<()> {
        for kind in HookKind::ALL {
            self.install(kind)?;
        }
        Ok(())
    }

    /// True iff the hook file exists, is executable, and references its
    /// canonical trigger file name. This string match is the installer's
    /// self-test.
    pub fn is_installed(&self, kind: HookKind) -> bool {
        let path = self.hook_path(kind);
        let Ok(metadata) = std::fs::metadata(&path) else {
            return false;
        };
        if !metadata.is_file() {
            return false;
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if metadata.permissions().mode() & 0o111 == 0 {
                return false;
            }
        }
        std::fs::read_to_string(&path)
            .map(|content| content.contains(kind.trigger_file_name()))
            .unwrap_or(false)
    }

    pub fn installed_hooks(&self) -> Vec<HookKind> {
        HookKind::ALL
            .into_iter()
            .filter(|kind| self.is_installed(*kind))
            .collect()
    }

    fn script_for(&self, kind: HookKind) -> String {
        match kind {
            HookKind::PreCommit => self.pre_commit_script(),
            HookKind::PostCheckout => Self::post_checkout_script(),
            HookKind::PostCommit => Self::post_commit_script(),
            HookKind::PostMerge => self.post_merge_script(),
        }
    }

    fn pre_commit_script(&self) -> String {
        let timeout = self.hook_timeout_secs;
        // Fail-closed blocks the commit when no result arrives; fail-open
        // lets it through with a warning.
        let on_timeout = if self.fail_open { "exit 0" } else { "exit 1" };
        format!(
            r#"#!/bin/sh
# Installed by umsd: validate the model store before each commit.
REPO_ROOT=$(git rev-parse --show-toplevel) || exit 1
UMS_DIR="$REPO_ROOT/.ums"
mkdir -p "$UMS_DIR/results"

REQUEST_ID="$(date +%s%N)-$$"
COMMIT_SHA=$(git rev-parse --quiet --verify HEAD || echo 0000000000000000000000000000000000000000)
BRANCH=$(git symbolic-ref --short -q HEAD || echo detached)

TMP="$UMS_DIR/validate-trigger.tmp.$$"
printf 'request_id=%s\ncommit_sha=%s\nbranch=%s\n' "$REQUEST_ID" "$COMMIT_SHA" "$BRANCH" > "$TMP"
mv "$TMP" "$UMS_DIR/validate-trigger"

TXT="$UMS_DIR/results/$REQUEST_ID.txt"
JSON="$UMS_DIR/results/$REQUEST_ID.json"
DEADLINE=$(( $(date +%s) + {timeout} ))
while [ "$(date +%s)" -lt "$DEADLINE" ]; do
    if [ -f "$TXT" ] && [ -f "$JSON" ]; then
        if grep -q PASSED "$TXT"; then
            rm -f "$TXT" "$JSON"
            exit 0
        fi
        cat "$TXT" >&2
        rm -f "$TXT" "$JSON"
        exit 1
    fi
    sleep 0.1
done
echo "ums: no validation result within {timeout}s; is the UMS process running?" >&2
{on_timeout}
"#
        )
    }

    fn post_checkout_script() -> String {
        r#"#!/bin/sh
# Installed by umsd: reload the model store after a branch switch.
REPO_ROOT=$(git rev-parse --show-toplevel) || exit 0
UMS_DIR="$REPO_ROOT/.ums"
mkdir -p "$UMS_DIR"

BRANCH=$(git symbolic-ref --short -q HEAD || echo detached)
TMP="$UMS_DIR/reload-trigger.tmp.$$"
printf 'branch=%s\n' "$BRANCH" > "$TMP"
mv "$TMP" "$UMS_DIR/reload-trigger"
exit 0
"#
        .to_string()
    }

    fn post_commit_script() -> String {
        r#"#!/bin/sh
# Installed by umsd: record the changelog under the real commit SHA.
REPO_ROOT=$(git rev-parse --show-toplevel) || exit 0
UMS_DIR="$REPO_ROOT/.ums"
mkdir -p "$UMS_DIR"

COMMIT_SHA=$(git rev-parse HEAD)
BRANCH=$(git symbolic-ref --short -q HEAD || echo detached)
TMP="$UMS_DIR/post-commit-trigger.tmp.$$"
printf 'commit_sha=%s\nbranch=%s\n' "$COMMIT_SHA" "$BRANCH" > "$TMP"
mv "$TMP" "$UMS_DIR/post-commit-trigger"
exit 0
"#
        .to_string()
    }

    fn post_merge_script(&self) -> String {
        let timeout = self.hook_timeout_secs;
        format!(
            r#"#!/bin/sh
# Installed by umsd: audit the merged model state. Advisory, never blocks.
REPO_ROOT=$(git rev-parse --show-toplevel) || exit 0
UMS_DIR="$REPO_ROOT/.ums"
mkdir -p "$UMS_DIR/merge-results"

REQUEST_ID="$(date +%s%N)-$$"
MERGE_SHA=$(git rev-parse HEAD)
TARGET_BRANCH=$(git symbolic-ref --short -q HEAD || echo detached)
SOURCE_BRANCH=$(git name-rev --name-only --refs='refs/heads/*' HEAD^2 2>/dev/null || echo unknown)

TMP="$UMS_DIR/merge-trigger.tmp.$$"
printf 'request_id=%s\nmerge_commit_sha=%s\nsource_branch=%s\ntarget_branch=%s\n' \
    "$REQUEST_ID" "$MERGE_SHA" "$SOURCE_BRANCH" "$TARGET_BRANCH" > "$TMP"
mv "$TMP" "$UMS_DIR/merge-trigger"

TXT="$UMS_DIR/merge-results/$REQUEST_ID.txt"
JSON="$UMS_DIR/merge-results/$REQUEST_ID.json"
DEADLINE=$(( $(date +%s) + {timeout} ))
while [ "$(date +%s)" -lt "$DEADLINE" ]; do
    if [ -f "$TXT" ] && [ -f "$JSON" ]; then
        cat "$TXT"
        rm -f "$TXT" "$JSON"
        break
    fi
    sleep 0.1
done
exit 0
"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::testutil::*;

    fn installer(repo_root: &std::path::Path) -> HookInstaller {
        HookInstaller::new(repo_root, &CoordinationConfig::default()).unwrap()
    }

    #[test]
    fn install_all_writes_four_executable_hooks() {
        let dir = setup_test_repo();
        let installer = installer(dir.path());
        installer.install_all().unwrap();

        for kind in HookKind::ALL {
            let path = installer.hook_path(kind);
            assert!(path.exists(), "{kind} hook must exist");
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let mode = std::fs::metadata(&path).unwrap().permissions().mode();
                assert_ne!(mode & 0o111, 0, "{kind} hook must be executable");
            }
            let content = std::fs::read_to_string(&path).unwrap();
            assert!(
                content.contains(kind.trigger_file_name()),
                "{kind} hook must reference {}",
                kind.trigger_file_name()
            );
            assert!(installer.is_installed(kind));
        }
        assert_eq!(installer.installed_hooks().len(), 4);
    }

    #[test]
    fn is_installed_false_before_installation() {
        let dir = setup_test_repo();
        let installer = installer(dir.path());
        assert!(!installer.is_installed(HookKind::PreCommit));
        assert!(installer.installed_hooks().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_hook_is_not_installed() {
        use std::os::unix::fs::PermissionsExt;
        let dir = setup_test_repo();
        let installer = installer(dir.path());
        installer.install(HookKind::PreCommit).unwrap();

        let path = installer.hook_path(HookKind::PreCommit);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert!(!installer.is_installed(HookKind::PreCommit));
    }

    #[test]
    fn foreign_hook_content_is_not_installed() {
        let dir = setup_test_repo();
        let installer = installer(dir.path());
        std::fs::create_dir_all(installer.hook_path(HookKind::PreCommit).parent().unwrap())
            .unwrap();
        std::fs::write(
            installer.hook_path(HookKind::PreCommit),
            "#!/bin/sh\nexit 0\n",
        )
        .unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(
                installer.hook_path(HookKind::PreCommit),
                std::fs::Permissions::from_mode(0o755),
            )
            .unwrap();
        }
        assert!(!installer.is_installed(HookKind::PreCommit));
    }

    #[test]
    fn pre_commit_script_is_fail_closed_by_default() {
        let dir = setup_test_repo();
        let script = installer(dir.path()).pre_commit_script();
        assert!(script.contains("grep -q PASSED"));
        let after_timeout = script.split("is the UMS process running?").nth(1).unwrap();
        assert!(after_timeout.contains("exit 1"));
    }

    #[test]
    fn pre_commit_script_can_be_fail_open() {
        let dir = setup_test_repo();
        let config = CoordinationConfig {
            fail_open: true,
            ..CoordinationConfig::default()
        };
        let script = HookInstaller::new(dir.path(), &config)
            .unwrap()
            .pre_commit_script();
        let after_timeout = script.split("is the UMS process running?").nth(1).unwrap();
        assert!(after_timeout.contains("exit 0"));
    }

    #[test]
    fn reinstall_overwrites_previous_script() {
        let dir = setup_test_repo();
        let installer = installer(dir.path());
        installer.install(HookKind::PostCommit).unwrap();
        std::fs::write(installer.hook_path(HookKind::PostCommit), "stale").unwrap();
        installer.install(HookKind::PostCommit).unwrap();
        assert!(installer.is_installed(HookKind::PostCommit));
    }
}
