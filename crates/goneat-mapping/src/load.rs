use std::sync::Arc;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use goneat_assets::EmbeddedAssets;
use goneat_schema::{SchemaRegistry, parse_document};
use goneat_types::Severity;
use goneat_types::ids::{DEFAULT_MAPPING_MANIFEST, MAPPING_MANIFEST_VERSION, SCHEMA_MAPPINGS_MANIFEST_V1};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ManifestError;
use crate::model::{Layer, Manifest};

/// A non-fatal note produced while loading.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LoadResult {
    pub effective: Manifest,
    pub builtin: Manifest,
    pub overlay: Option<Manifest>,
    pub manifest_path: Utf8PathBuf,
    pub diagnostics: Vec<Diagnostic>,
}

/// The builtin manifest shipped with the binary.
pub fn builtin_manifest() -> Result<Manifest, ManifestError> {
    let manifest: Manifest = serde_yaml::from_str(EmbeddedAssets::builtin_mappings())
        .map_err(|e| ManifestError::Builtin(e.to_string()))?;
    Ok(manifest.with_layer(Layer::Builtin))
}

/// Loads the builtin manifest and merges the repository overlay onto it.
#[derive(Clone, Debug)]
pub struct Manager {
    registry: Arc<SchemaRegistry>,
}

impl Manager {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }

    /// Load `manifest_path` (default `.goneat/schema-mappings.yaml`) relative to `repo_root`.
    ///
    /// A missing overlay is not an error. Any problem with a present overlay
    /// fails the whole load; nothing is partially merged.
    pub fn load(
        &self,
        repo_root: &Utf8Path,
        manifest_path: Option<&Utf8Path>,
    ) -> Result<LoadResult, ManifestError> {
        let requested = manifest_path.unwrap_or(Utf8Path::new(DEFAULT_MAPPING_MANIFEST));
        let path = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            repo_root.join(requested)
        };
        let path = ensure_within_repo(repo_root, &path)?;
        let builtin = builtin_manifest()?;

        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(%path, "no repository mapping overlay");
                return Ok(LoadResult {
                    effective: builtin.clone(),
                    builtin,
                    overlay: None,
                    diagnostics: vec![Diagnostic::info(format!(
                        "no mapping manifest at {path}; using builtin mappings"
                    ))],
                    manifest_path: path,
                });
            }
            Err(source) => return Err(ManifestError::Read { path, source }),
        };

        let overlay = self.parse_overlay(&path, &bytes)?;
        let effective = builtin.merge(&overlay);
        info!(
            %path,
            mappings = overlay.mappings.len(),
            exclusions = overlay.exclusions.len(),
            overrides = overlay.overrides.len(),
            "loaded repository mapping overlay"
        );
        Ok(LoadResult {
            effective,
            builtin,
            overlay: Some(overlay),
            manifest_path: path,
            diagnostics: Vec::new(),
        })
    }

    fn parse_overlay(&self, path: &Utf8Path, bytes: &[u8]) -> Result<Manifest, ManifestError> {
        let value = parse_document(bytes, "mapping manifest").map_err(|e| ManifestError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let report = self
            .registry
            .validate_value(SCHEMA_MAPPINGS_MANIFEST_V1, &value)?;
        if !report.valid {
            return Err(ManifestError::Invalid {
                path: path.to_path_buf(),
                errors: report
                    .errors
                    .iter()
                    .map(|e| format!("{}: {}", e.path, e.message))
                    .collect(),
            });
        }

        let manifest: Manifest =
            serde_json::from_value(value).map_err(|e| ManifestError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        if manifest.version != MAPPING_MANIFEST_VERSION {
            return Err(ManifestError::UnsupportedVersion {
                path: path.to_path_buf(),
                found: manifest.version,
                expected: MAPPING_MANIFEST_VERSION,
            });
        }
        Ok(manifest.with_layer(Layer::Repository))
    }
}

/// Reject `path` unless it stays under `repo_root` after lexical normalization.
///
/// Returns the normalized absolute path.
pub fn ensure_within_repo(
    repo_root: &Utf8Path,
    path: &Utf8Path,
) -> Result<Utf8PathBuf, ManifestError> {
    let root = absolute(repo_root)?;
    let candidate = if path.is_absolute() {
        lexical_normalize(path)
    } else {
        lexical_normalize(&root.join(path))
    };
    if candidate.starts_with(&root) {
        Ok(candidate)
    } else {
        Err(ManifestError::OutsideRepo {
            path: path.to_path_buf(),
            root,
        })
    }
}

fn absolute(path: &Utf8Path) -> Result<Utf8PathBuf, ManifestError> {
    if path.is_absolute() {
        return Ok(lexical_normalize(path));
    }
    let cwd = std::env::current_dir().map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(|p| ManifestError::Parse {
        path: path.to_path_buf(),
        reason: format!("working directory {} is not UTF-8", p.display()),
    })?;
    Ok(lexical_normalize(&cwd.join(path)))
}

/// Resolve `.` and `..` without touching the filesystem.
fn lexical_normalize(path: &Utf8Path) -> Utf8PathBuf {
    let mut out = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_str()),
        }
    }
    out
}
