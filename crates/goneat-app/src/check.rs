//! The `check` use case: resolve every repository file and validate mapped ones.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use goneat_mapping::{Diagnostic, Manager, Metrics, Resolution, Resolver};
use goneat_schema::{
    BatchOptions, CompiledSchema, ROOT_PATH, SchemaRegistry, SecurityContext,
    compile_schema_with_ref_dirs, validate_files,
};
use goneat_types::{BatchResult, RepoPath, ValidationResult};
use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::validate::compile_options;

const DATA_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

#[derive(Clone, Debug)]
pub struct CheckInput<'a> {
    pub registry: Arc<SchemaRegistry>,
    pub repo_root: &'a Utf8Path,
    pub manifest: Option<&'a Utf8Path>,
    pub ref_dirs: &'a [Utf8PathBuf],
    pub offline: bool,
    /// Its security context is narrowed to the repository root.
    pub batch: BatchOptions,
}

#[derive(Clone, Debug, Serialize)]
pub struct CheckReport {
    pub manifest_path: Utf8PathBuf,
    pub diagnostics: Vec<Diagnostic>,
    pub metrics: Metrics,
    /// Unmapped data files, listed when `warn_unmapped` is on.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unmapped: Vec<String>,
    pub batch: BatchResult,
}

/// Files mapped to the same schema, validated as one batch.
#[derive(Debug, Default)]
struct Group {
    override_path: Option<String>,
    files: Vec<Utf8PathBuf>,
}

pub fn run_check(input: CheckInput<'_>) -> anyhow::Result<CheckReport> {
    let loaded = Manager::new(Arc::clone(&input.registry))
        .load(input.repo_root, input.manifest)
        .context("load mapping manifest")?;
    let mut resolver = Resolver::new(&loaded.effective).context("compile mapping rules")?;
    let config = loaded.effective.config;

    let mut groups: BTreeMap<String, Group> = BTreeMap::new();
    let mut unmapped = Vec::new();
    for rel in repo_files(input.repo_root)? {
        match resolver.resolve(rel.as_str()) {
            Resolution::Mapped(mapped) => {
                let group = groups.entry(mapped.schema_id).or_default();
                group.override_path = mapped.override_path;
                group.files.push(input.repo_root.join(rel.as_str()));
            }
            Resolution::Excluded(_) => {}
            Resolution::Unmapped => {
                if is_data_file(&rel) {
                    unmapped.push(rel.to_string());
                }
            }
        }
    }

    let mut batch = input.batch.clone();
    batch.security = SecurityContext {
        allowed_dirs: vec![input.repo_root.to_path_buf()],
        ..batch.security
    };

    let mut report = BatchResult::new(0);
    for (schema_id, group) in &groups {
        let part = match load_group_schema(&input, &batch, schema_id, group) {
            Ok(schema) => validate_files(&schema, &group.files, &batch)
                .with_context(|| format!("validate files mapped to {schema_id}"))?,
            Err(err) => {
                debug!(schema = %schema_id, error = %format!("{err:#}"), "schema unavailable");
                unavailable(schema_id, &err, &group.files)
            }
        };
        report.absorb(relativize(part, input.repo_root));
    }

    if config.strict() {
        let mut strict = BatchResult::new(unmapped.len());
        for path in &unmapped {
            strict.record(
                path.clone(),
                ValidationResult::failure(ROOT_PATH, "no schema mapping matches this file (strict mode)"),
            );
        }
        report.absorb(strict);
    }

    info!(
        files = resolver.metrics().files_evaluated,
        validated = report.total_files,
        invalid = report.invalid_files,
        "repository check finished"
    );

    Ok(CheckReport {
        manifest_path: loaded.manifest_path,
        diagnostics: loaded.diagnostics,
        metrics: resolver.metrics(),
        unmapped: if config.warn_unmapped() { unmapped } else { Vec::new() },
        batch: report,
    })
}

/// Map a batch verdict to an exit code: 0 = pass, 2 = fail.
pub fn batch_exit_code(batch: &BatchResult) -> i32 {
    if batch.is_pass() { 0 } else { 2 }
}

fn load_group_schema(
    input: &CheckInput<'_>,
    batch: &BatchOptions,
    schema_id: &str,
    group: &Group,
) -> anyhow::Result<Arc<CompiledSchema>> {
    let options = compile_options(input.offline, batch);
    match &group.override_path {
        Some(rel) => {
            let path = input.repo_root.join(rel);
            let bytes = batch
                .security
                .read_file(&path)
                .with_context(|| format!("read override schema {path} for {schema_id}"))?;
            let schema = compile_schema_with_ref_dirs(&bytes, input.ref_dirs, &options)
                .with_context(|| format!("compile override schema {path}"))?;
            Ok(Arc::new(schema))
        }
        None => input
            .registry
            .get_validator(schema_id)
            .with_context(|| format!("schema {schema_id} is not available")),
    }
}

fn unavailable(schema_id: &str, err: &anyhow::Error, files: &[Utf8PathBuf]) -> BatchResult {
    let mut batch = BatchResult::new(files.len());
    for file in files {
        batch.record(
            file.as_str(),
            ValidationResult::failure(ROOT_PATH, format!("cannot validate against {schema_id}: {err:#}")),
        );
    }
    batch
}

/// Re-key results by repository-relative path.
fn relativize(batch: BatchResult, root: &Utf8Path) -> BatchResult {
    let mut out = BatchResult::new(batch.total_files);
    for (path, result) in batch.results {
        let rel = Utf8Path::new(&path)
            .strip_prefix(root)
            .map(|p| p.to_string())
            .unwrap_or(path);
        out.record(rel, result);
    }
    out
}

/// Every file under `root` except `.git`, as sorted repository-relative paths.
fn repo_files(root: &Utf8Path) -> anyhow::Result<Vec<RepoPath>> {
    let mut out = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || e.file_name() != ".git");
    for entry in walker {
        let entry = entry.with_context(|| format!("walk {root}"))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(path) = Utf8Path::from_path(entry.path()) else {
            debug!(path = %entry.path().display(), "skipping non UTF-8 path");
            continue;
        };
        let rel = path.strip_prefix(root).unwrap_or(path);
        out.push(RepoPath::from(rel));
    }
    Ok(out)
}

fn is_data_file(path: &RepoPath) -> bool {
    path.extension_lower()
        .is_some_and(|ext| DATA_EXTENSIONS.contains(&ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> (tempfile::TempDir, Utf8PathBuf) {
        let tmp = tempfile::tempdir().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf8");
        (tmp, root)
    }

    fn write(root: &Utf8Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(path, contents).expect("write");
    }

    fn check(root: &Utf8Path) -> CheckReport {
        run_check(CheckInput {
            registry: Arc::new(SchemaRegistry::embedded()),
            repo_root: root,
            manifest: None,
            ref_dirs: &[],
            offline: false,
            batch: BatchOptions::default(),
        })
        .expect("check")
    }

    #[test]
    fn builtin_mappings_validate_goneat_config() {
        let (_tmp, root) = repo();
        write(&root, ".goneat/config.yaml", "version: 1.0.0\nbogus: true\n");
        write(&root, "README.md", "# hi\n");
        write(&root, ".git/config.yaml", "ignored: true\n");

        let report = check(&root);
        assert_eq!(report.batch.total_files, 1);
        assert_eq!(report.batch.invalid_files, 1);
        assert!(report.batch.results.contains_key(".goneat/config.yaml"));
        assert_eq!(batch_exit_code(&report.batch), 2);
    }

    #[test]
    fn override_schema_from_repository_is_used() {
        let (_tmp, root) = repo();
        write(
            &root,
            ".goneat/schema-mappings.yaml",
            "version: \"1.0.0\"\nmappings:\n  - pattern: \"deploy/*.yaml\"\n    schema_id: deploy\noverrides:\n  - schema_id: deploy\n    path: schemas/deploy.json\n",
        );
        write(
            &root,
            "schemas/deploy.json",
            r#"{"type":"object","required":["replicas"],"properties":{"replicas":{"type":"integer"}}}"#,
        );
        write(&root, "deploy/web.yaml", "replicas: 2\n");
        write(&root, "deploy/api.yaml", "replicas: many\n");
        write(&root, "notes/todo.yaml", "a: 1\n");

        let report = check(&root);
        let deploy_files: Vec<&String> = report
            .batch
            .results
            .keys()
            .filter(|k| k.starts_with("deploy/"))
            .collect();
        assert_eq!(deploy_files.len(), 2);
        assert!(report.batch.results["deploy/web.yaml"].valid);
        assert!(!report.batch.results["deploy/api.yaml"].valid);
        assert!(report.unmapped.contains(&"notes/todo.yaml".to_string()));
    }

    #[test]
    fn unknown_schema_ids_become_failed_entries() {
        let (_tmp, root) = repo();
        write(
            &root,
            ".goneat/schema-mappings.yaml",
            "version: \"1.0.0\"\nconfig:\n  warn_unmapped: false\nmappings:\n  - pattern: \"*.yaml\"\n    schema_id: does-not-exist\n",
        );
        write(&root, "app.yaml", "a: 1\n");

        let report = check(&root);
        let result = &report.batch.results["app.yaml"];
        assert!(!result.valid);
        assert!(result.errors[0].message.contains("does-not-exist"));
        assert!(report.unmapped.is_empty());
    }

    #[test]
    fn strict_mode_fails_unmapped_data_files() {
        let (_tmp, root) = repo();
        write(
            &root,
            ".goneat/schema-mappings.yaml",
            "version: \"1.0.0\"\nconfig:\n  strict: true\n",
        );
        write(&root, "stray.json", "{}");

        let report = check(&root);
        assert!(!report.batch.results["stray.json"].valid);
        assert_eq!(report.batch.valid_files + report.batch.invalid_files, report.batch.total_files);
    }
}
