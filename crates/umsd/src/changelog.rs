//! Permanent audit records under `.ums/`: per-commit semantic changelogs and
//! per-merge metadata. Both are written once via atomic rename and never
//! deleted by the coordination layer.

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use thiserror::Error;
use ums_core::{write_atomic, UmsPaths};

use crate::git;

#[derive(Debug, Error)]
pub enum ChangelogError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed metadata ({path}): missing key {key}")]
    MissingKey { path: String, key: String },
}

pub type Result<T> = std::result::Result<T, ChangelogError>;

const NO_FILE_CHANGES: &str = "No file changes detected.";

/// One commit's audit record of the model state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticChangelog {
    pub commit_sha: String,
    pub branch: String,
    pub author_name: String,
    pub author_email: String,
    pub author_date: String,
    /// `added: foo.model` style lines, already filtered to model files.
    pub file_changes: Vec<String>,
}

impl SemanticChangelog {
    /// Gather the changelog for a commit from the repository.
    ///
    /// Works for both real SHAs (author and diff come from git) and the
    /// provisional SHA a pre-commit hook guesses (identity falls back to the
    /// configured user, the diff to the no-changes sentinel).
    pub fn for_commit(
        repo_root: &Path,
        commit_sha: &str,
        branch: &str,
        model_extension: &str,
    ) -> Self {
        let (author_name, author_email, author_date) =
            match git::commit_author(repo_root, commit_sha) {
                Some(author) => author,
                None => {
                    let (name, email) = git::configured_identity(repo_root);
                    (name, email, Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true))
                }
            };

        let suffix = format!(".{model_extension}");
        let file_changes = git::changed_files(repo_root, commit_sha)
            .into_iter()
            .filter(|(_, path)| path.ends_with(&suffix))
            .map(|(kind, path)| format!("{}: {path}", kind.as_str()))
            .collect();

        Self {
            commit_sha: commit_sha.to_string(),
            branch: branch.to_string(),
            author_name,
            author_email,
            author_date,
            file_changes,
        }
    }

    /// Render the single-file text layout.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("SEMANTIC CHANGELOG\n");
        out.push_str(&format!("Commit:     {}\n", self.commit_sha));
        out.push_str(&format!("Branch:     {}\n", self.branch));
        out.push_str(&format!(
            "Author:     {} <{}>\n",
            self.author_name, self.author_email
        ));
        out.push_str(&format!("AuthorDate: {}\n", self.author_date));
        out.push('\n');
        out.push_str("FILE CHANGES\n");
        if self.file_changes.is_empty() {
            out.push_str(NO_FILE_CHANGES);
            out.push('\n');
        } else {
            for change in &self.file_changes {
                out.push_str(change);
                out.push('\n');
            }
        }
        out
    }

    /// Write the changelog to `changelogs/<short sha>.txt`.
    pub fn write_to(&self, paths: &UmsPaths) -> Result<()> {
        let path = paths.changelog_file(&self.commit_sha);
        write_atomic(&path, self.render().as_bytes())?;
        Ok(())
    }
}

/// Permanent audit record of one merge, keyed by the merge commit SHA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeMetadata {
    pub merge_commit_sha: String,
    pub source_branch: String,
    pub target_branch: String,
    pub valid: bool,
    pub timestamp: String,
}

impl MergeMetadata {
    pub fn new(
        merge_commit_sha: impl Into<String>,
        source_branch: impl Into<String>,
        target_branch: impl Into<String>,
        valid: bool,
    ) -> Self {
        Self {
            merge_commit_sha: merge_commit_sha.into(),
            source_branch: source_branch.into(),
            target_branch: target_branch.into(),
            valid,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// Write the record to `merges/<merge sha>.metadata`.
    pub fn write_to(&self, paths: &UmsPaths) -> Result<()> {
        let content = format!(
            "mergeCommitSha={}\nsourceBranch={}\ntargetBranch={}\nvalid={}\ntimestamp={}\n",
            self.merge_commit_sha, self.source_branch, self.target_branch, self.valid,
            self.timestamp
        );
        let path = paths.merge_metadata_file(&self.merge_commit_sha);
        write_atomic(&path, content.as_bytes())?;
        Ok(())
    }

    /// Read a record back, or `None` when no metadata exists for the SHA.
    pub fn read_from(paths: &UmsPaths, merge_sha: &str) -> Result<Option<Self>> {
        let path = paths.merge_metadata_file(merge_sha);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut fields = std::collections::HashMap::new();
        for line in content.lines() {
            if let Some((key, value)) = line.split_once('=') {
                fields.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        let require = |key: &str| -> Result<String> {
            fields
                .get(key)
                .cloned()
                .ok_or_else(|| ChangelogError::MissingKey {
                    path: path.display().to_string(),
                    key: key.to_string(),
                })
        };
        Ok(Some(Self {
            merge_commit_sha: require("mergeCommitSha")?,
            source_branch: require("sourceBranch")?,
            target_branch: require("targetBranch")?,
            valid: require("valid")? == "true",
            timestamp: require("timestamp")?,
        }))
    }

    pub fn exists(paths: &UmsPaths, merge_sha: &str) -> bool {
        paths.merge_metadata_file(merge_sha).exists()
    }
}
