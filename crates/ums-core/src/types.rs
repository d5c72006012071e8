//! Core types for the hook/watcher coordination protocol.
//!
//! A trigger record is the typed content of a singleton trigger file written
//! by a git hook; a request id links a trigger to its result files.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier linking a trigger to its result files.
///
/// Uses UUIDv7 so ids are URL-safe, time-ordered, and distinct even for two
/// triggers created within the same millisecond. Hook scripts generate their
/// own ids (epoch-nanos plus pid); both forms travel through the same
/// `from_string` path on the watcher side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The four git hooks the coordination layer installs and listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    PreCommit,
    PostCheckout,
    PostCommit,
    PostMerge,
}

impl HookKind {
    pub const ALL: [HookKind; 4] = [
        Self::PreCommit,
        Self::PostCheckout,
        Self::PostCommit,
        Self::PostMerge,
    ];

    /// Git hook file name inside the hooks directory.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreCommit => "pre-commit",
            Self::PostCheckout => "post-checkout",
            Self::PostCommit => "post-commit",
            Self::PostMerge => "post-merge",
        }
    }

    /// Canonical trigger file name this hook writes under `.ums/`.
    ///
    /// The installer self-test checks that the installed script contains this
    /// exact substring.
    pub fn trigger_file_name(&self) -> &'static str {
        match self {
            Self::PreCommit => "validate-trigger",
            Self::PostCheckout => "reload-trigger",
            Self::PostCommit => "post-commit-trigger",
            Self::PostMerge => "merge-trigger",
        }
    }

    /// Only the pre-commit hook waits for a result and may abort the commit.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::PreCommit)
    }
}

impl std::fmt::Display for HookKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Trigger records ---

/// Written by the pre-commit hook; the commit SHA is the hook's provisional
/// guess (HEAD at hook time), not the SHA git will assign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationTrigger {
    pub request_id: RequestId,
    pub commit_sha: String,
    pub branch: String,
}

/// Written by the post-checkout hook. Fire-and-forget: no request id, no
/// result files; consumption of the trigger is the only observable signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadTrigger {
    pub branch: String,
}

/// Written by the post-commit hook with the real SHA from `git rev-parse HEAD`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCommitTrigger {
    pub commit_sha: String,
    pub branch: String,
}

/// Written by the post-merge hook after git has created the merge commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeTrigger {
    pub request_id: RequestId,
    pub merge_commit_sha: String,
    pub source_branch: String,
    pub target_branch: String,
}
