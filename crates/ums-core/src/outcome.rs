//! Validation outcome: the four-variant result of validating the model store.
//!
//! The structured form on disk is the uniform shape
//! `{ "valid": bool, "errors": [..], "warnings": [..] }` for every variant.
//! Deserialization re-derives the variant from the fields and must keep
//! warnings attached to failures: the historical regression was a
//! failure-path reader that silently dropped them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutcomeError {
    #[error("invalid outcome record: {0}")]
    InvalidRecord(String),
    #[error("malformed outcome json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result of one validation pass over the model store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Valid, no errors, no warnings.
    Success,
    /// Valid, warnings present.
    SuccessWithWarnings(Vec<String>),
    /// Invalid, errors present, no warnings.
    Failure(Vec<String>),
    /// Invalid, both errors and warnings present.
    FailureWithWarnings(Vec<String>, Vec<String>),
}

impl ValidationOutcome {
    pub fn success() -> Self {
        Self::Success
    }

    pub fn success_with_warnings(warnings: Vec<String>) -> Self {
        debug_assert!(!warnings.is_empty());
        Self::SuccessWithWarnings(warnings)
    }

    pub fn failure(errors: Vec<String>) -> Self {
        debug_assert!(!errors.is_empty());
        Self::Failure(errors)
    }

    pub fn failure_with_warnings(errors: Vec<String>, warnings: Vec<String>) -> Self {
        debug_assert!(!errors.is_empty() && !warnings.is_empty());
        Self::FailureWithWarnings(errors, warnings)
    }

    /// Build the right variant from collected errors and warnings.
    pub fn from_findings(errors: Vec<String>, warnings: Vec<String>) -> Self {
        match (errors.is_empty(), warnings.is_empty()) {
            (true, true) => Self::Success,
            (true, false) => Self::SuccessWithWarnings(warnings),
            (false, true) => Self::Failure(errors),
            (false, false) => Self::FailureWithWarnings(errors, warnings),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Success | Self::SuccessWithWarnings(_))
    }

    pub fn has_errors(&self) -> bool {
        !self.errors().is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings().is_empty()
    }

    pub fn errors(&self) -> &[String] {
        match self {
            Self::Success | Self::SuccessWithWarnings(_) => &[],
            Self::Failure(errors) | Self::FailureWithWarnings(errors, _) => errors,
        }
    }

    pub fn warnings(&self) -> &[String] {
        match self {
            Self::Success | Self::Failure(_) => &[],
            Self::SuccessWithWarnings(warnings) | Self::FailureWithWarnings(_, warnings) => {
                warnings
            }
        }
    }

    /// Structured (JSON) form.
    pub fn to_json(&self) -> Result<String, OutcomeError> {
        let record = OutcomeRecord {
            valid: self.is_valid(),
            errors: self.errors().to_vec(),
            warnings: self.warnings().to_vec(),
        };
        Ok(serde_json::to_string_pretty(&record)?)
    }

    /// Parse the structured form back into the matching variant.
    pub fn from_json(json: &str) -> Result<Self, OutcomeError> {
        let record: OutcomeRecord = serde_json::from_str(json)?;
        if record.valid && !record.errors.is_empty() {
            return Err(OutcomeError::InvalidRecord(
                "valid outcome carries errors".to_string(),
            ));
        }
        if !record.valid && record.errors.is_empty() {
            return Err(OutcomeError::InvalidRecord(
                "invalid outcome carries no errors".to_string(),
            ));
        }
        // Warnings are attached to both the success and the failure variants.
        Ok(Self::from_findings(record.errors, record.warnings))
    }

    /// Human-readable text form for terminal display.
    ///
    /// The first line is the literal token `PASSED` or `FAILED` so hook
    /// scripts can grep without parsing JSON.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(if self.is_valid() { "PASSED" } else { "FAILED" });
        out.push('\n');
        if self.has_errors() {
            out.push_str("\nErrors:\n");
            for error in self.errors() {
                out.push_str("  - ");
                out.push_str(error);
                out.push('\n');
            }
        }
        if self.has_warnings() {
            out.push_str("\nWarnings:\n");
            for warning in self.warnings() {
                out.push_str("  - ");
                out.push_str(warning);
                out.push('\n');
            }
        }
        out
    }
}

/// Uniform wire shape shared by all four variants.
#[derive(Debug, Serialize, Deserialize)]
struct OutcomeRecord {
    valid: bool,
    #[serde(default)]
    errors: Vec<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn success_has_no_findings() {
        let outcome = ValidationOutcome::success();
        assert!(outcome.is_valid());
        assert!(!outcome.has_errors());
        assert!(!outcome.has_warnings());
    }

    #[test]
    fn variant_queries() {
        let outcome = ValidationOutcome::failure_with_warnings(
            strings(&["bad reference"]),
            strings(&["large model"]),
        );
        assert!(!outcome.is_valid());
        assert!(outcome.has_errors());
        assert!(outcome.has_warnings());
        assert_eq!(outcome.errors(), strings(&["bad reference"]).as_slice());
        assert_eq!(outcome.warnings(), strings(&["large model"]).as_slice());
    }

    #[test]
    fn json_round_trip_all_variants() {
        let variants = [
            ValidationOutcome::success(),
            ValidationOutcome::success_with_warnings(strings(&["no model resources loaded"])),
            ValidationOutcome::failure(strings(&["unresolved reference in example.model"])),
            ValidationOutcome::failure_with_warnings(
                strings(&["duplicate component name"]),
                strings(&["large model detected"]),
            ),
        ];
        for outcome in variants {
            let json = outcome.to_json().unwrap();
            let back = ValidationOutcome::from_json(&json).unwrap();
            assert_eq!(back, outcome);
        }
    }

    #[test]
    fn failure_warnings_survive_round_trip() {
        // Regression guard: the failure-path deserializer must not drop warnings.
        let outcome = ValidationOutcome::failure_with_warnings(
            strings(&["null correspondence model"]),
            strings(&["large model detected"]),
        );
        let back = ValidationOutcome::from_json(&outcome.to_json().unwrap()).unwrap();
        assert!(!back.is_valid());
        assert!(back.has_warnings());
        assert_eq!(back.warnings()[0], "large model detected");
    }

    #[test]
    fn text_form_contains_passed_token_on_success() {
        let text = ValidationOutcome::success().to_text();
        assert!(text.starts_with("PASSED"));
        assert!(!text.contains("Errors:"));
        assert!(!text.contains("Warnings:"));
    }

    #[test]
    fn text_form_lists_errors_and_warnings() {
        let text = ValidationOutcome::failure_with_warnings(
            strings(&["e1", "e2"]),
            strings(&["w1"]),
        )
        .to_text();
        assert!(text.starts_with("FAILED"));
        assert!(text.contains("Errors:\n  - e1\n  - e2\n"));
        assert!(text.contains("Warnings:\n  - w1\n"));
    }

    #[test]
    fn from_json_rejects_inconsistent_records() {
        assert!(ValidationOutcome::from_json(r#"{"valid":true,"errors":["e"],"warnings":[]}"#)
            .is_err());
        assert!(ValidationOutcome::from_json(r#"{"valid":false,"errors":[],"warnings":[]}"#)
            .is_err());
    }

    #[test]
    fn from_json_defaults_missing_lists() {
        let outcome = ValidationOutcome::from_json(r#"{"valid":true}"#).unwrap();
        assert_eq!(outcome, ValidationOutcome::success());
    }
}
