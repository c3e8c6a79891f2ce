//! Offline `$ref` resolution against directories of loose schema files.

use std::collections::{BTreeMap, HashMap};

use camino::{Utf8Path, Utf8PathBuf};
use goneat_types::ValidationResult;
use serde_json::Value;
use tracing::debug;
use walkdir::WalkDir;

use crate::compile::{CompileOptions, CompiledSchema, compile_document};
use crate::document::{SchemaDocument, check_declared_draft, normalize_uri, parse_document};
use crate::error::SchemaError;

const SCHEMA_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdIndexEntry {
    pub id: String,
    pub path: Utf8PathBuf,
    /// Canonical JSON bytes; two entries for one id must match exactly.
    pub normalized: Vec<u8>,
}

/// `$id` to schema document, built once from a set of reference directories.
#[derive(Clone, Debug, Default)]
pub struct IdIndex {
    entries: BTreeMap<String, IdIndexEntry>,
    documents: HashMap<String, Value>,
}

impl IdIndex {
    pub fn build_from_ref_dirs<P: AsRef<Utf8Path>>(dirs: &[P]) -> Result<Self, SchemaError> {
        Self::build(dirs, None, false)
    }

    pub(crate) fn build<P: AsRef<Utf8Path>>(
        dirs: &[P],
        skip_id: Option<&str>,
        offline: bool,
    ) -> Result<Self, SchemaError> {
        let mut index = IdIndex::default();
        for dir in dirs {
            index.scan_dir(dir.as_ref(), skip_id, offline)?;
        }
        debug!(schemas = index.len(), "built $id index");
        Ok(index)
    }

    fn scan_dir(
        &mut self,
        dir: &Utf8Path,
        skip_id: Option<&str>,
        offline: bool,
    ) -> Result<(), SchemaError> {
        if !dir.is_dir() {
            return Err(SchemaError::RefDir {
                dir: dir.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| SchemaError::RefDir {
                dir: dir.to_path_buf(),
                reason: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(path) = Utf8Path::from_path(entry.path()) else {
                debug!(path = %entry.path().display(), "skipping non UTF-8 path");
                continue;
            };
            if !has_schema_extension(path) {
                continue;
            }
            let bytes = std::fs::read(path).map_err(|e| SchemaError::io(path, e))?;
            let doc = match SchemaDocument::parse(&bytes, offline) {
                Ok(doc) if doc.value.is_object() => doc,
                Ok(_) => {
                    debug!(%path, "skipping ref-dir file: not a JSON object");
                    continue;
                }
                Err(e) => {
                    debug!(%path, error = %e, "skipping ref-dir file: not parseable");
                    continue;
                }
            };
            let Some(id) = doc.id.clone() else {
                debug!(%path, "skipping ref-dir file: no $id");
                continue;
            };
            if skip_id == Some(id.as_str()) {
                debug!(%path, %id, "skipping copy of the root schema");
                continue;
            }
            self.insert(IdIndexEntry {
                id,
                path: path.to_path_buf(),
                normalized: doc.normalized_bytes(),
            }, doc.value)?;
        }
        Ok(())
    }

    fn insert(&mut self, entry: IdIndexEntry, value: Value) -> Result<(), SchemaError> {
        if let Some(existing) = self.entries.get(&entry.id) {
            if existing.normalized == entry.normalized {
                debug!(id = %entry.id, path = %entry.path, "duplicate $id with identical content");
                return Ok(());
            }
            return Err(SchemaError::RefConflict {
                id: entry.id,
                existing: existing.path.clone(),
                duplicate: entry.path,
            });
        }
        self.documents.insert(entry.id.clone(), value);
        self.entries.insert(entry.id.clone(), entry);
        Ok(())
    }

    /// Look up `id` after the same normalization applied to indexed `$id`s.
    pub fn get(&self, id: &str) -> Option<&IdIndexEntry> {
        self.entries.get(&normalize_uri(id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in `$id` order.
    pub fn iter(&self) -> impl Iterator<Item = &IdIndexEntry> {
        self.entries.values()
    }

    pub(crate) fn documents(&self) -> HashMap<String, Value> {
        self.documents.clone()
    }
}

pub fn build_id_index_from_ref_dirs<P: AsRef<Utf8Path>>(
    dirs: &[P],
) -> Result<IdIndex, SchemaError> {
    IdIndex::build_from_ref_dirs(dirs)
}

fn has_schema_extension(path: &Utf8Path) -> bool {
    path.extension()
        .map(|ext| SCHEMA_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Compile `schema_bytes`, resolving `$ref`s only from the schemas found in `ref_dirs`.
pub fn compile_schema_with_ref_dirs<P: AsRef<Utf8Path>>(
    schema_bytes: &[u8],
    ref_dirs: &[P],
    options: &CompileOptions,
) -> Result<CompiledSchema, SchemaError> {
    let root = SchemaDocument::parse(schema_bytes, options.offline)?;
    if options.enforce_draft {
        check_declared_draft(root.declared.as_ref())?;
    }
    // `root.id` is already normalized, so a differently-cased copy is still skipped.
    let index = IdIndex::build(ref_dirs, root.id.as_deref(), options.offline)?;
    compile_document(None, &root, index.documents())
}

/// The offline resolution entry point: compile against `ref_dirs`, then validate `data_bytes`.
pub fn validate_from_bytes_with_ref_dirs<P: AsRef<Utf8Path>>(
    schema_bytes: &[u8],
    data_bytes: &[u8],
    ref_dirs: &[P],
) -> Result<ValidationResult, SchemaError> {
    let schema =
        compile_schema_with_ref_dirs(schema_bytes, ref_dirs, &CompileOptions::from_env())?;
    let data = parse_document(data_bytes, "data")?;
    Ok(schema.validate(&data))
}
