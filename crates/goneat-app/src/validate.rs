//! The `validate` use case: one schema, many data files.

use std::sync::Arc;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use goneat_schema::{
    BatchOptions, CompileOptions, CompiledSchema, SchemaRegistry, compile_schema_with_ref_dirs,
    validate_directory, validate_files,
};
use goneat_types::BatchResult;
use serde::Serialize;

#[derive(Clone, Copy, Debug)]
pub enum SchemaSource<'a> {
    /// A schema known to the registry (`goneat-config-v1.0.0`, `dates`, ...).
    Embedded(&'a str),
    File(&'a Utf8Path),
}

#[derive(Clone, Debug)]
pub struct ValidateInput<'a> {
    pub registry: Arc<SchemaRegistry>,
    pub schema: SchemaSource<'a>,
    /// Directories of loose schemas that `$ref`s may point into.
    pub ref_dirs: &'a [Utf8PathBuf],
    /// Data files; directories are walked for `.json`, `.yaml` and `.yml`.
    pub paths: &'a [Utf8PathBuf],
    /// Force offline compilation regardless of the environment.
    pub offline: bool,
    pub batch: BatchOptions,
}

#[derive(Clone, Debug, Serialize)]
pub struct ValidateOutput {
    pub schema: String,
    #[serde(flatten)]
    pub batch: BatchResult,
}

pub fn run_validate(input: ValidateInput<'_>) -> anyhow::Result<ValidateOutput> {
    let options = compile_options(input.offline, &input.batch);
    let schema = load_schema(&input, &options)?;

    let (dirs, files): (Vec<&Utf8PathBuf>, Vec<&Utf8PathBuf>) =
        input.paths.iter().partition(|p| p.is_dir());

    let mut batch = validate_files(&schema, &files, &input.batch).context("validate files")?;
    for dir in dirs {
        let more = validate_directory(&schema, dir, &input.batch)
            .with_context(|| format!("validate directory {dir}"))?;
        batch.absorb(more);
    }

    Ok(ValidateOutput {
        schema: schema.name().to_string(),
        batch,
    })
}

pub(crate) fn compile_options(offline: bool, batch: &BatchOptions) -> CompileOptions {
    let from_env = CompileOptions::from_env();
    CompileOptions {
        offline: offline || from_env.offline,
        enforce_draft: batch.security.enforce_draft,
    }
}

fn load_schema(
    input: &ValidateInput<'_>,
    options: &CompileOptions,
) -> anyhow::Result<Arc<CompiledSchema>> {
    match input.schema {
        SchemaSource::Embedded(name)
            if input.ref_dirs.is_empty() && input.registry.options() == *options =>
        {
            input
                .registry
                .get_validator(name)
                .with_context(|| format!("load embedded schema {name}"))
        }
        // Options differ from the registry's: compile a private copy.
        SchemaSource::Embedded(name) if input.ref_dirs.is_empty() => {
            let compiled = input
                .registry
                .compile_with(name, options)
                .with_context(|| format!("compile embedded schema {name}"))?;
            Ok(Arc::new(compiled))
        }
        SchemaSource::Embedded(name) => {
            let bytes = input
                .registry
                .schema_bytes(name)
                .with_context(|| format!("load embedded schema {name}"))?;
            let compiled = compile_schema_with_ref_dirs(&bytes, input.ref_dirs, options)
                .with_context(|| format!("compile embedded schema {name}"))?;
            Ok(Arc::new(compiled))
        }
        SchemaSource::File(path) => {
            let bytes = input
                .batch
                .security
                .read_file(path)
                .with_context(|| format!("read schema {path}"))?;
            let compiled = compile_schema_with_ref_dirs(&bytes, input.ref_dirs, options)
                .with_context(|| format!("compile schema {path}"))?;
            Ok(Arc::new(compiled))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goneat_assets::StaticAssets;
    use goneat_schema::SecurityContext;

    fn workspace() -> (tempfile::TempDir, Utf8PathBuf) {
        let tmp = tempfile::tempdir().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf8");
        (tmp, root)
    }

    fn batch(root: &Utf8Path) -> BatchOptions {
        BatchOptions::default().with_security(SecurityContext::allowing([root.to_path_buf()]))
    }

    #[test]
    fn embedded_schema_over_files_and_directories() {
        let (_tmp, root) = workspace();
        std::fs::create_dir_all(root.join("more")).expect("mkdir");
        std::fs::write(root.join("config.yaml"), "version: 1.0.0\n").expect("write");
        std::fs::write(root.join("more/a.yaml"), "version: 1.0.0\n").expect("write");
        std::fs::write(root.join("more/b.yaml"), "version: 1.0.0\nunknown: true\n").expect("write");

        let out = run_validate(ValidateInput {
            registry: Arc::new(SchemaRegistry::embedded()),
            schema: SchemaSource::Embedded("goneat-config-v1.0.0"),
            ref_dirs: &[],
            paths: &[root.join("config.yaml"), root.join("more")],
            offline: false,
            batch: batch(&root),
        })
        .expect("validate");
        assert_eq!(out.schema, "goneat-config-v1.0.0");
        assert_eq!(out.batch.total_files, 3);
        assert_eq!(out.batch.invalid_files, 1);
    }

    #[test]
    fn schema_file_with_ref_dirs() {
        let (_tmp, root) = workspace();
        std::fs::create_dir_all(root.join("refs")).expect("mkdir");
        std::fs::write(
            root.join("refs/types.json"),
            r#"{"$id":"https://x/types","$defs":{"slug":{"type":"string","pattern":"^[a-z0-9-]+$"}}}"#,
        )
        .expect("write");
        std::fs::write(
            root.join("root.json"),
            r#"{"$id":"https://x/root","type":"object","properties":{"k":{"$ref":"https://x/types#/$defs/slug"}},"required":["k"]}"#,
        )
        .expect("write");
        std::fs::write(root.join("ok.json"), r#"{"k":"nextcloud"}"#).expect("write");

        let schema_path = root.join("root.json");
        let out = run_validate(ValidateInput {
            registry: Arc::new(SchemaRegistry::embedded()),
            schema: SchemaSource::File(&schema_path),
            ref_dirs: &[root.join("refs")],
            paths: &[root.join("ok.json")],
            offline: true,
            batch: batch(&root),
        })
        .expect("validate");
        assert!(out.batch.is_pass());
        assert_eq!(out.schema, "https://x/root");
    }

    fn embedded_input<'a>(
        registry: &Arc<SchemaRegistry>,
        name: &'a str,
        paths: &'a [Utf8PathBuf],
        offline: bool,
        batch: BatchOptions,
    ) -> ValidateInput<'a> {
        ValidateInput {
            registry: Arc::clone(registry),
            schema: SchemaSource::Embedded(name),
            ref_dirs: &[],
            paths,
            offline,
            batch,
        }
    }

    #[test]
    fn embedded_schema_honours_draft_gate_and_offline_flags() {
        let (_tmp, root) = workspace();
        std::fs::write(root.join("a.json"), r#"{"n":1}"#).expect("write");
        let assets = StaticAssets::new()
            .with(
                "schemas/legacy/legacy-v1.json",
                br#"{"$schema":"http://json-schema.org/draft-04/schema#","type":"object"}"#.to_vec(),
            )
            .with(
                "schemas/app/app-v1.json",
                br#"{"$schema":"http://json-schema.org/draft-07/schema#","type":"object"}"#.to_vec(),
            );
        let registry = Arc::new(SchemaRegistry::with_options(
            Arc::new(assets),
            CompileOptions::default(),
        ));
        let paths = [root.join("a.json")];

        let err = run_validate(embedded_input(&registry, "legacy-v1", &paths, false, batch(&root)))
            .expect_err("draft-04 rejected with the gate on");
        assert!(format!("{err:#}").contains("draft-04"));

        let mut lax = batch(&root);
        lax.security.enforce_draft = false;
        let out = run_validate(embedded_input(&registry, "legacy-v1", &paths, false, lax))
            .expect("gate disabled");
        assert!(out.batch.is_pass());
        assert_eq!(out.schema, "legacy-v1");
        assert!(!registry.is_cached("legacy-v1"));

        let out = run_validate(embedded_input(&registry, "app-v1", &paths, true, batch(&root)))
            .expect("offline compile");
        assert!(out.batch.is_pass());
        assert!(!registry.is_cached("app-v1"), "offline copy must not replace the cached one");
    }

    #[test]
    fn unknown_embedded_schema_is_an_error() {
        let (_tmp, root) = workspace();
        let err = run_validate(ValidateInput {
            registry: Arc::new(SchemaRegistry::embedded()),
            schema: SchemaSource::Embedded("nope"),
            ref_dirs: &[],
            paths: &[],
            offline: false,
            batch: batch(&root),
        })
        .expect_err("unknown");
        assert!(format!("{err:#}").contains("nope"));
    }
}
