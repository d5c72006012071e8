//! Well-known paths under `<repo>/.ums/` and the atomic write primitive.

use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// All well-known paths of the coordination directory.
///
/// Singleton trigger files live directly under `.ums/`; request-scoped result
/// files and permanent audit records get their own subdirectories.
#[derive(Debug, Clone)]
pub struct UmsPaths {
    pub root: PathBuf,
    pub ums_dir: PathBuf,
    pub validate_trigger: PathBuf,
    pub reload_trigger: PathBuf,
    pub post_commit_trigger: PathBuf,
    pub merge_trigger: PathBuf,
    pub results_dir: PathBuf,
    pub merge_results_dir: PathBuf,
    pub changelogs_dir: PathBuf,
    pub merges_dir: PathBuf,
    pub config_file: PathBuf,
}

impl UmsPaths {
    /// Derive all paths from a repo root. Pure computation, no I/O.
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        let root = repo_root.into();
        let ums_dir = root.join(".ums");
        Self {
            validate_trigger: ums_dir.join("validate-trigger"),
            reload_trigger: ums_dir.join("reload-trigger"),
            post_commit_trigger: ums_dir.join("post-commit-trigger"),
            merge_trigger: ums_dir.join("merge-trigger"),
            results_dir: ums_dir.join("results"),
            merge_results_dir: ums_dir.join("merge-results"),
            changelogs_dir: ums_dir.join("changelogs"),
            merges_dir: ums_dir.join("merges"),
            config_file: ums_dir.join("config"),
            ums_dir,
            root,
        }
    }

    /// Create all required directories. Idempotent.
    pub fn ensure_layout(&self) -> io::Result<()> {
        for dir in [
            &self.ums_dir,
            &self.results_dir,
            &self.merge_results_dir,
            &self.changelogs_dir,
            &self.merges_dir,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Changelog file for a commit, keyed by the 7-character SHA prefix.
    pub fn changelog_file(&self, commit_sha: &str) -> PathBuf {
        let short = &commit_sha[..commit_sha.len().min(7)];
        self.changelogs_dir.join(format!("{short}.txt"))
    }

    /// Permanent merge metadata record for a merge commit.
    pub fn merge_metadata_file(&self, merge_sha: &str) -> PathBuf {
        self.merges_dir.join(format!("{merge_sha}.metadata"))
    }
}

/// Write `bytes` to `path` atomically: temp sibling in the same directory,
/// then rename into place. Rename on the same filesystem is the only ordering
/// primitive concurrent readers rely on; they never observe a torn file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;
    std::fs::create_dir_all(dir)?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let tmp = dir.join(format!(".{file_name}.{}.tmp", Uuid::now_v7()));
    std::fs::write(&tmp, bytes)?;
    match std::fs::rename(&tmp, path) {
        Ok(()) => Ok(()),
        Err(e) => {
            let _ = std::fs::remove_file(&tmp);
            Err(e)
        }
    }
}
