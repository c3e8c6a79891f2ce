//! Schema mapping: which schema governs which repository file.
//!
//! A builtin manifest ships with the binary; a repository may add rules in
//! `.goneat/schema-mappings.yaml`. [`Manager`] loads and merges the two,
//! [`Resolver`] answers path queries against the merged result.

#![forbid(unsafe_code)]

mod error;
mod load;
mod model;
mod resolve;

pub use error::ManifestError;
pub use load::{Diagnostic, LoadResult, Manager, builtin_manifest, ensure_within_repo};
pub use model::{
    ConfigSettings, ExclusionAction, ExclusionRule, InferenceMethod, Layer, Manifest, MappingRule,
    OverrideRule,
};
pub use resolve::{ExcludedPath, MappedSchema, Metrics, Resolution, Resolver};
