use camino::Utf8Path;
use goneat_types::ids::SOURCE_TYPE_FILE;
use goneat_types::{ErrorContext, Severity, ValidationResult};

use crate::compile::{CompileOptions, CompiledSchema, compile_schema_with};
use crate::document::parse_document;
use crate::error::SchemaError;
use crate::security::SecurityContext;

/// Compile `schema_bytes` and validate `data_bytes` against it.
pub fn validate_bytes(
    schema_bytes: &[u8],
    data_bytes: &[u8],
) -> Result<ValidationResult, SchemaError> {
    let schema = compile_schema_with(schema_bytes, &CompileOptions::from_env())?;
    schema.validate_bytes(data_bytes)
}

/// Validate one data file. Every reported error carries the file as context.
pub fn validate_file(
    schema: &CompiledSchema,
    path: &Utf8Path,
    security: &SecurityContext,
) -> Result<ValidationResult, SchemaError> {
    let bytes = security.read_file(path)?;
    let data = parse_document(&bytes, "data")?;
    Ok(schema.validate(&data).with_context(file_context(path)))
}

/// Compile the schema file at `schema_path`, then validate `data_path` with it.
pub fn validate_file_with_schema_path(
    schema_path: &Utf8Path,
    data_path: &Utf8Path,
    security: &SecurityContext,
) -> Result<ValidationResult, SchemaError> {
    let bytes = security.read_file(schema_path)?;
    let options = CompileOptions::from_env().enforce_draft(security.enforce_draft);
    let schema = compile_schema_with(&bytes, &options)?;
    validate_file(&schema, data_path, security)
}

pub(crate) fn file_context(path: &Utf8Path) -> ErrorContext {
    ErrorContext {
        source_file: path.to_string(),
        source_type: SOURCE_TYPE_FILE.to_string(),
        severity: Severity::Error,
    }
}
