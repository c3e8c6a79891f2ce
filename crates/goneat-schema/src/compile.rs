use std::collections::HashMap;

use goneat_types::ids::ENV_OFFLINE_SCHEMA_VALIDATION;
use goneat_types::{ValidationError, ValidationResult};
use jsonschema::{Retrieve, Uri, Validator};
use serde_json::Value;

use crate::document::{
    SchemaDocument, SchemaDraft, check_declared_draft, normalize_uri, parse_document,
};
use crate::error::SchemaError;
use crate::messages::convert_error;

/// Name given to schemas compiled from bytes without a `$id`.
pub const INLINE_SCHEMA_NAME: &str = "(inline)";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompileOptions {
    /// Strip `$schema` from every document before it is registered.
    pub offline: bool,
    /// Reject dialects other than draft-07 and 2020-12.
    pub enforce_draft: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            offline: false,
            enforce_draft: true,
        }
    }
}

impl CompileOptions {
    /// Defaults, with `offline` taken from `GONEAT_OFFLINE_SCHEMA_VALIDATION`.
    pub fn from_env() -> Self {
        Self {
            offline: offline_from_env(),
            ..Self::default()
        }
    }

    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn enforce_draft(mut self, enforce: bool) -> Self {
        self.enforce_draft = enforce;
        self
    }
}

pub fn offline_from_env() -> bool {
    std::env::var(ENV_OFFLINE_SCHEMA_VALIDATION)
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// A compiled validation program. Immutable and shareable across threads.
pub struct CompiledSchema {
    name: String,
    id: Option<String>,
    draft: SchemaDraft,
    validator: Validator,
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("draft", &self.draft)
            .finish_non_exhaustive()
    }
}

impl CompiledSchema {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn draft(&self) -> SchemaDraft {
        self.draft
    }

    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }

    pub fn validate(&self, instance: &Value) -> ValidationResult {
        let errors: Vec<ValidationError> = self
            .validator
            .iter_errors(instance)
            .map(|e| convert_error(&e))
            .collect();
        ValidationResult::from_errors(errors)
    }

    /// Parse `data` (YAML, then JSON) and validate it.
    pub fn validate_bytes(&self, data: &[u8]) -> Result<ValidationResult, SchemaError> {
        let instance = parse_document(data, "data")?;
        Ok(self.validate(&instance))
    }
}

/// Compile with [`CompileOptions::from_env`].
pub fn compile_schema(bytes: &[u8]) -> Result<CompiledSchema, SchemaError> {
    compile_schema_with(bytes, &CompileOptions::from_env())
}

pub fn compile_schema_with(
    bytes: &[u8],
    options: &CompileOptions,
) -> Result<CompiledSchema, SchemaError> {
    compile_named(None, bytes, options)
}

pub(crate) fn compile_named(
    name: Option<&str>,
    bytes: &[u8],
    options: &CompileOptions,
) -> Result<CompiledSchema, SchemaError> {
    let doc = SchemaDocument::parse(bytes, options.offline)?;
    if options.enforce_draft {
        check_declared_draft(doc.declared.as_ref())?;
    }
    compile_document(name, &doc, HashMap::new())
}

/// Build the validator for `doc`, serving `$ref` targets from `documents` only.
pub(crate) fn compile_document(
    name: Option<&str>,
    doc: &SchemaDocument,
    documents: HashMap<String, Value>,
) -> Result<CompiledSchema, SchemaError> {
    let name = name
        .map(str::to_string)
        .or_else(|| doc.id.clone())
        .unwrap_or_else(|| INLINE_SCHEMA_NAME.to_string());
    let validator = jsonschema::options()
        .with_draft(doc.draft.to_engine())
        .with_retriever(InMemoryRetriever { documents })
        .build(&doc.value)
        .map_err(|e| SchemaError::Compile {
            schema: name.clone(),
            reason: e.to_string(),
        })?;
    tracing::debug!(schema = %name, draft = ?doc.draft, "compiled schema");
    Ok(CompiledSchema {
        name,
        id: doc.id.clone(),
        draft: doc.draft,
        validator,
    })
}

/// Resolves `$ref` targets from memory; never touches the network.
struct InMemoryRetriever {
    documents: HashMap<String, Value>,
}

impl Retrieve for InMemoryRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let requested = uri.as_str();
        let key = normalize_uri(requested);
        if let Some(value) = self
            .documents
            .get(&key)
            .or_else(|| self.documents.get(key.trim_end_matches('/')))
        {
            return Ok(value.clone());
        }
        // Metaschemas are known to the engine; anything else we cannot serve offline.
        if key.contains("json-schema.org/") {
            return Ok(Value::Object(serde_json::Map::new()));
        }
        Err(format!("schema {requested} is not registered and remote retrieval is disabled").into())
    }
}
