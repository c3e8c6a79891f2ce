use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Severity is intentionally small: it maps cleanly to CI signals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    #[default]
    Error,
}

/// File-level context, attached only when the caller validated a file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub source_file: String,
    pub source_type: String,
    pub severity: Severity,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Dotted field path (`service.ports.0`), `(root)` for the document itself.
    pub path: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            context: None,
        }
    }
}

/// Outcome of validating one document. Structural mismatches live here, never in `Err`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn from_errors(errors: Vec<ValidationError>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// A single-error failure, used when a file could not even be validated.
    pub fn failure(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::from_errors(vec![ValidationError::new(path, message)])
    }

    pub fn with_context(mut self, context: ErrorContext) -> Self {
        for err in &mut self.errors {
            err.context = Some(context.clone());
        }
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallSeverity {
    #[default]
    Pass,
    Fail,
}

/// Aggregate of a batch validation run, keyed by the input path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub total_files: usize,
    pub valid_files: usize,
    pub invalid_files: usize,
    pub overall_severity: OverallSeverity,
    pub results: BTreeMap<String, ValidationResult>,
}

impl BatchResult {
    pub fn new(total_files: usize) -> Self {
        Self {
            total_files,
            ..Self::default()
        }
    }

    /// Record one file outcome and keep counters and severity in sync.
    ///
    /// Recording a path again replaces its earlier outcome, so each path is
    /// counted once.
    pub fn record(&mut self, path: impl Into<String>, result: ValidationResult) {
        if result.valid {
            self.valid_files += 1;
        } else {
            self.invalid_files += 1;
        }
        if let Some(previous) = self.results.insert(path.into(), result) {
            if previous.valid {
                self.valid_files = self.valid_files.saturating_sub(1);
            } else {
                self.invalid_files = self.invalid_files.saturating_sub(1);
            }
        }
        self.overall_severity = if self.invalid_files == 0 {
            OverallSeverity::Pass
        } else {
            OverallSeverity::Fail
        };
    }

    /// Fold another batch into this one (used when files are grouped per schema).
    pub fn absorb(&mut self, other: BatchResult) {
        let overlap = other
            .results
            .keys()
            .filter(|path| self.results.contains_key(*path))
            .count();
        self.total_files += other.total_files.saturating_sub(overlap);
        for (path, result) in other.results {
            self.record(path, result);
        }
    }

    pub fn is_pass(&self) -> bool {
        self.overall_severity == OverallSeverity::Pass
    }
}
