//! Stable DTOs and IDs shared across the goneat workspace.
//!
//! This crate is intentionally boring:
//! - validation results and batch summaries emitted by the schema engine
//! - stable string IDs, env var names and default locations
//! - canonical repo-relative path handling

#![forbid(unsafe_code)]

pub mod ids;
pub mod path;
pub mod validation;

pub use path::RepoPath;
pub use validation::{
    BatchResult, ErrorContext, OverallSeverity, Severity, ValidationError, ValidationResult,
};
