//! Offline JSON Schema validation for repository configuration.
//!
//! Schemas may be written in YAML or JSON and are normalized to canonical JSON
//! before compilation. Only draft-07 and 2020-12 are accepted. `$ref`s are
//! served from memory (a [`SchemaRegistry`] or an [`IdIndex`] built from
//! reference directories); no compiled schema ever reaches the network.

#![forbid(unsafe_code)]

mod batch;
mod compile;
mod document;
mod error;
mod file;
mod messages;
mod refs;
mod registry;
mod security;

pub use batch::{BatchOptions, DEFAULT_BATCH_TIMEOUT, validate_directory, validate_files};
pub use compile::{
    CompileOptions, CompiledSchema, INLINE_SCHEMA_NAME, compile_schema, compile_schema_with,
    offline_from_env,
};
pub use document::{SchemaDraft, canonicalize, ensure_supported_draft, parse_document};
pub use error::SchemaError;
pub use file::{validate_bytes, validate_file, validate_file_with_schema_path};
pub use messages::{ROOT_PATH, field_path};
pub use refs::{
    IdIndex, IdIndexEntry, build_id_index_from_ref_dirs, compile_schema_with_ref_dirs,
    validate_from_bytes_with_ref_dirs,
};
pub use registry::{SchemaRegistry, legacy_schema_path};
pub use security::{DEFAULT_MAX_FILE_SIZE, SecurityContext, sanitize_path};
