//! Request-scoped result files: the watcher side of the coordination protocol.
//!
//! Every result materializes as two sibling files keyed by request id: a
//! human-readable `.txt` for terminal display and a structured `.json` the
//! hook parses. A reader treats a partial pair as "not ready"; the text
//! sibling is written first, so the JSON appearing second closes the race.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::outcome::{OutcomeError, ValidationOutcome};
use crate::paths::write_atomic;
use crate::types::RequestId;

#[derive(Debug, Error)]
pub enum ResultError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Outcome(#[from] OutcomeError),
}

pub type Result<T> = std::result::Result<T, ResultError>;

/// Result files bound to one directory (`results/` or `merge-results/`).
#[derive(Debug, Clone)]
pub struct ResultFiles {
    dir: PathBuf,
}

impl ResultFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn text_path(&self, request_id: &RequestId) -> PathBuf {
        self.dir.join(format!("{request_id}.txt"))
    }

    pub fn json_path(&self, request_id: &RequestId) -> PathBuf {
        self.dir.join(format!("{request_id}.json"))
    }

    /// Write both result siblings, text first.
    ///
    /// Each file lands via atomic rename; rewriting the same id replaces the
    /// previous content outright.
    pub fn write_result(&self, outcome: &ValidationOutcome, request_id: &RequestId) -> Result<()> {
        write_atomic(&self.text_path(request_id), outcome.to_text().as_bytes())?;
        write_atomic(&self.json_path(request_id), outcome.to_json()?.as_bytes())?;
        Ok(())
    }

    /// Read the structured result back, or `None` while either sibling is
    /// missing.
    pub fn read_result(&self, request_id: &RequestId) -> Result<Option<ValidationOutcome>> {
        if !self.exists(request_id) {
            return Ok(None);
        }
        let json = std::fs::read_to_string(self.json_path(request_id))?;
        Ok(Some(ValidationOutcome::from_json(&json)?))
    }

    /// Both siblings present.
    pub fn exists(&self, request_id: &RequestId) -> bool {
        self.text_path(request_id).exists() && self.json_path(request_id).exists()
    }

    /// Best-effort removal of both siblings.
    pub fn delete_result(&self, request_id: &RequestId) {
        let _ = std::fs::remove_file(self.text_path(request_id));
        let _ = std::fs::remove_file(self.json_path(request_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ResultFiles) {
        let tmp = TempDir::new().unwrap();
        let results = ResultFiles::new(tmp.path().join("results"));
        (tmp, results)
    }

    #[test]
    fn write_then_read_round_trips() {
        let (_tmp, results) = setup();
        let id = RequestId::new();
        let outcome =
            ValidationOutcome::success_with_warnings(vec!["no model resources loaded".into()]);

        results.write_result(&outcome, &id).unwrap();
        assert!(results.exists(&id));
        assert_eq!(results.read_result(&id).unwrap().unwrap(), outcome);
    }

    #[test]
    fn all_four_variants_round_trip_through_disk() {
        let (_tmp, results) = setup();
        let variants = [
            ValidationOutcome::success(),
            ValidationOutcome::success_with_warnings(vec!["w".into()]),
            ValidationOutcome::failure(vec!["e".into()]),
            ValidationOutcome::failure_with_warnings(vec!["e1".into()], vec!["w1".into()]),
        ];
        for outcome in variants {
            let id = RequestId::new();
            results.write_result(&outcome, &id).unwrap();
            let back = results.read_result(&id).unwrap().unwrap();
            assert_eq!(back, outcome);
            assert_eq!(back.has_warnings(), outcome.has_warnings());
        }
    }

    #[test]
    fn missing_sibling_reads_as_not_ready() {
        let (_tmp, results) = setup();
        let id = RequestId::new();
        let outcome = ValidationOutcome::success();
        results.write_result(&outcome, &id).unwrap();

        // Drop the JSON sibling: the pair is incomplete, not malformed.
        std::fs::remove_file(results.json_path(&id)).unwrap();
        assert!(!results.exists(&id));
        assert!(results.read_result(&id).unwrap().is_none());

        // Same when only the text sibling is missing.
        results.write_result(&outcome, &id).unwrap();
        std::fs::remove_file(results.text_path(&id)).unwrap();
        assert!(results.read_result(&id).unwrap().is_none());
    }

    #[test]
    fn rewriting_same_id_replaces_content() {
        let (_tmp, results) = setup();
        let id = RequestId::new();

        results
            .write_result(&ValidationOutcome::failure(vec!["first".into()]), &id)
            .unwrap();
        results
            .write_result(&ValidationOutcome::success(), &id)
            .unwrap();

        let back = results.read_result(&id).unwrap().unwrap();
        assert_eq!(back, ValidationOutcome::success());
        let text = std::fs::read_to_string(results.text_path(&id)).unwrap();
        assert!(!text.contains("first"));
    }

    #[test]
    fn distinct_ids_are_independently_addressable() {
        let (_tmp, results) = setup();
        let id1 = RequestId::new();
        let id2 = RequestId::new();

        results
            .write_result(&ValidationOutcome::success(), &id1)
            .unwrap();
        results
            .write_result(&ValidationOutcome::failure(vec!["e".into()]), &id2)
            .unwrap();

        assert!(results.read_result(&id1).unwrap().unwrap().is_valid());
        assert!(!results.read_result(&id2).unwrap().unwrap().is_valid());
    }

    #[test]
    fn delete_result_removes_both_siblings() {
        let (_tmp, results) = setup();
        let id = RequestId::new();
        results
            .write_result(&ValidationOutcome::success(), &id)
            .unwrap();

        results.delete_result(&id);
        assert!(!results.text_path(&id).exists());
        assert!(!results.json_path(&id).exists());
        // Deleting again is harmless.
        results.delete_result(&id);
    }
}
