//! Singleton trigger files: the hook side of the coordination protocol.
//!
//! One well-known path per trigger type. Presence means "pending request",
//! absence means "no work". The hook writes the file atomically; the watcher
//! claims it by renaming it away, so no two poll iterations can observe the
//! same trigger. Content is `key=value` lines because the pre-commit and
//! post-merge writers are plain sh scripts.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::paths::{write_atomic, UmsPaths};
use crate::types::{
    MergeTrigger, PostCommitTrigger, ReloadTrigger, RequestId, ValidationTrigger,
};

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed trigger ({path}): missing key {key}")]
    MissingKey { path: String, key: String },
}

pub type Result<T> = std::result::Result<T, TriggerError>;

/// Render a trigger record as `key=value` lines and write it atomically.
fn write_record(path: &Path, fields: &[(&str, &str)]) -> Result<()> {
    let mut content = String::new();
    for (key, value) in fields {
        content.push_str(key);
        content.push('=');
        content.push_str(value);
        content.push('\n');
    }
    write_atomic(path, content.as_bytes())?;
    Ok(())
}

/// Claim the singleton trigger file, if present.
///
/// Rename-to-claim makes consumption atomic: once the rename succeeds no other
/// iteration can see the trigger, and a concurrently written replacement lands
/// at the original path untouched. Returns the raw content, or `None` when no
/// trigger is pending.
fn claim(path: &Path) -> Result<Option<String>> {
    let claim_path = path.with_file_name(format!(
        ".{}.claim-{}",
        path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
        Uuid::now_v7()
    ));
    match std::fs::rename(path, &claim_path) {
        Ok(()) => {
            let content = std::fs::read_to_string(&claim_path)?;
            let _ = std::fs::remove_file(&claim_path);
            Ok(Some(content))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Parse `key=value` lines. Blank lines and `#` comments are skipped; lines
/// without `=` are ignored rather than fatal, since the writer may be a hook
/// script a user has edited.
fn parse_fields(content: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = trimmed.split_once('=') {
            fields.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    fields
}

fn require<'a>(
    fields: &'a HashMap<String, String>,
    path: &Path,
    key: &str,
) -> Result<&'a String> {
    fields.get(key).ok_or_else(|| TriggerError::MissingKey {
        path: path.display().to_string(),
        key: key.to_string(),
    })
}

/// Claim and parse a trigger file, treating malformed content as absent.
///
/// A malformed trigger is logged and dropped (the claim already removed it
/// from the singleton path), so one bad file cannot wedge the watcher.
fn claim_parsed<T>(
    path: &Path,
    parse: impl FnOnce(&HashMap<String, String>) -> Result<T>,
) -> Result<Option<T>> {
    let Some(content) = claim(path)? else {
        return Ok(None);
    };
    let fields = parse_fields(&content);
    match parse(&fields) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "dropping malformed trigger");
            Ok(None)
        }
    }
}

/// Singleton trigger written by the pre-commit hook.
#[derive(Debug, Clone)]
pub struct ValidationTriggerFile {
    path: PathBuf,
}

impl ValidationTriggerFile {
    pub fn new(paths: &UmsPaths) -> Self {
        Self {
            path: paths.validate_trigger.clone(),
        }
    }

    /// Generate a fresh request id, write the trigger, return the id.
    pub fn create_trigger(&self, commit_sha: &str, branch: &str) -> Result<RequestId> {
        let request_id = RequestId::new();
        write_record(
            &self.path,
            &[
                ("request_id", request_id.as_ref()),
                ("commit_sha", commit_sha),
                ("branch", branch),
            ],
        )?;
        Ok(request_id)
    }

    pub fn check_and_clear(&self) -> Result<Option<ValidationTrigger>> {
        claim_parsed(&self.path, |fields| {
            Ok(ValidationTrigger {
                request_id: RequestId::from_string(require(fields, &self.path, "request_id")?),
                commit_sha: require(fields, &self.path, "commit_sha")?.clone(),
                branch: require(fields, &self.path, "branch")?.clone(),
            })
        })
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

/// Singleton trigger written by the post-checkout hook. Identifier-less.
#[derive(Debug, Clone)]
pub struct ReloadTriggerFile {
    path: PathBuf,
}

impl ReloadTriggerFile {
    pub fn new(paths: &UmsPaths) -> Self {
        Self {
            path: paths.reload_trigger.clone(),
        }
    }

    pub fn create_trigger(&self, branch: &str) -> Result<()> {
        write_record(&self.path, &[("branch", branch)])
    }

    pub fn check_and_clear(&self) -> Result<Option<ReloadTrigger>> {
        claim_parsed(&self.path, |fields| {
            Ok(ReloadTrigger {
                branch: require(fields, &self.path, "branch")?.clone(),
            })
        })
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

/// Singleton trigger written by the post-commit hook with the real SHA.
#[derive(Debug, Clone)]
pub struct PostCommitTriggerFile {
    path: PathBuf,
}

impl PostCommitTriggerFile {
    pub fn new(paths: &UmsPaths) -> Self {
        Self {
            path: paths.post_commit_trigger.clone(),
        }
    }

    pub fn create_trigger(&self, commit_sha: &str, branch: &str) -> Result<()> {
        write_record(
            &self.path,
            &[("commit_sha", commit_sha), ("branch", branch)],
        )
    }

    pub fn check_and_clear(&self) -> Result<Option<PostCommitTrigger>> {
        claim_parsed(&self.path, |fields| {
            Ok(PostCommitTrigger {
                commit_sha: require(fields, &self.path, "commit_sha")?.clone(),
                branch: require(fields, &self.path, "branch")?.clone(),
            })
        })
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

/// Singleton trigger written by the post-merge hook.
#[derive(Debug, Clone)]
pub struct MergeTriggerFile {
    path: PathBuf,
}

impl MergeTriggerFile {
    pub fn new(paths: &UmsPaths) -> Self {
        Self {
            path: paths.merge_trigger.clone(),
        }
    }

    pub fn create_trigger(
        &self,
        merge_commit_sha: &str,
        source_branch: &str,
        target_branch: &str,
    ) -> Result<RequestId> {
        let request_id = RequestId::new();
        write_record(
            &self.path,
            &[
                ("request_id", request_id.as_ref()),
                ("merge_commit_sha", merge_commit_sha),
                ("source_branch", source_branch),
                ("target_branch", target_branch),
            ],
        )?;
        Ok(request_id)
    }

    pub fn check_and_clear(&self) -> Result<Option<MergeTrigger>> {
        claim_parsed(&self.path, |fields| {
            Ok(MergeTrigger {
                request_id: RequestId::from_string(require(fields, &self.path, "request_id")?),
                merge_commit_sha: require(fields, &self.path, "merge_commit_sha")?.clone(),
                source_branch: require(fields, &self.path, "source_branch")?.clone(),
                target_branch: require(fields, &self.path, "target_branch")?.clone(),
            })
        })
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}
