//! Git plumbing for the watcher daemon.
//!
//! The coordination layer links no VCS library; everything goes through the
//! `git` binary, the same binary the installed hook scripts call.

use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("git command failed: {0}")]
    CommandFailed(String),
    #[error("failed to execute git: {0}")]
    Execution(#[from] std::io::Error),
    #[error("invalid utf-8 in git output")]
    InvalidUtf8,
}

pub type Result<T> = std::result::Result<T, GitError>;

fn run_git(repo_root: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_root)
        .output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitError::CommandFailed(format!(
            "git {}: {}",
            args.join(" "),
            stderr.trim()
        )));
    }
    String::from_utf8(output.stdout)
        .map(|s| s.trim().to_string())
        .map_err(|_| GitError::InvalidUtf8)
}

/// SHA of the current HEAD commit.
pub fn rev_parse_head(repo_root: &Path) -> Result<String> {
    run_git(repo_root, &["rev-parse", "HEAD"])
}

/// Short name of the currently checked-out branch.
pub fn current_branch(repo_root: &Path) -> Result<String> {
    run_git(repo_root, &["symbolic-ref", "--short", "HEAD"])
}

/// Directory git resolves for hook scripts, absolute.
///
/// `--git-path` keeps worktree and `core.hooksPath` layouts working; the
/// plain `.git/hooks` default falls out of the same call.
pub fn hooks_dir(repo_root: &Path) -> Result<PathBuf> {
    let path = run_git(repo_root, &["rev-parse", "--git-path", "hooks"])?;
    let path = PathBuf::from(path);
    Ok(if path.is_absolute() {
        path
    } else {
        repo_root.join(path)
    })
}

/// Author identity and date of a commit: `(name, email, author date ISO-8601)`.
///
/// `None` when the SHA does not name a real commit; the provisional SHA a
/// pre-commit hook guesses usually does not.
pub fn commit_author(repo_root: &Path, sha: &str) -> Option<(String, String, String)> {
    let raw = run_git(
        repo_root,
        &["log", "-1", "--format=%an%n%ae%n%aI", sha],
    )
    .ok()?;
    let mut lines = raw.lines();
    let name = lines.next()?.to_string();
    let email = lines.next()?.to_string();
    let date = lines.next()?.to_string();
    Some((name, email, date))
}

/// Configured user identity, for records about commits git has not made yet.
pub fn configured_identity(repo_root: &Path) -> (String, String) {
    let name = run_git(repo_root, &["config", "user.name"])
        .unwrap_or_else(|_| "unknown".to_string());
    let email = run_git(repo_root, &["config", "user.email"])
        .unwrap_or_else(|_| "unknown".to_string());
    (name, email)
}

/// How a file changed in a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// Files touched by a commit, from `git diff-tree --name-status`.
///
/// Empty when the SHA is not a real commit or the commit has no parent diff.
pub fn changed_files(repo_root: &Path, sha: &str) -> Vec<(ChangeKind, String)> {
    let Ok(raw) = run_git(
        repo_root,
        &["diff-tree", "--no-commit-id", "--name-status", "-r", sha],
    ) else {
        return Vec::new();
    };
    raw.lines()
        .filter_map(|line| {
            let (status, path) = line.split_once('\t')?;
            let kind = match status.chars().next()? {
                'A' => ChangeKind::Added,
                'M' => ChangeKind::Modified,
                'D' => ChangeKind::Removed,
                // Renames and copies show as modifications of the new path.
                'R' | 'C' => ChangeKind::Modified,
                _ => return None,
            };
            Some((kind, path.to_string()))
        })
        .collect()
}

#[cfg(test)]
pub mod testutil {
    //! Real-repository fixtures shared by the daemon's tests.

    use super::*;
    use tempfile::TempDir;

    /// Create a git repository with identity configured and one initial commit.
    pub fn setup_test_repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        git(dir.path(), &["init", "-b", "main"]);
        git(dir.path(), &["config", "user.email", "test@test.com"]);
        git(dir.path(), &["config", "user.name", "Test"]);
        std::fs::write(dir.path().join("README.md"), "# Test").unwrap();
        git(dir.path(), &["add", "."]);
        git(dir.path(), &["commit", "-m", "Initial commit"]);
        dir
    }

    /// Run a git command in a test repo, panicking on failure.
    pub fn git(repo_root: &Path, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(repo_root)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Stage everything and commit, returning the new HEAD SHA.
    pub fn commit_all(repo_root: &Path, message: &str) -> String {
        git(repo_root, &["add", "."]);
        git(repo_root, &["commit", "-m", message]);
        rev_parse_head(repo_root).unwrap()
    }
}
