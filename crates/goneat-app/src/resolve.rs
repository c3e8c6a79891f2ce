use std::sync::Arc;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use goneat_mapping::{Diagnostic, Manager, Metrics, Resolution, Resolver};
use goneat_schema::SchemaRegistry;
use serde::Serialize;

#[derive(Clone, Debug)]
pub struct ResolveInput<'a> {
    pub registry: Arc<SchemaRegistry>,
    pub repo_root: &'a Utf8Path,
    /// Overlay manifest, relative to `repo_root`; defaults to `.goneat/schema-mappings.yaml`.
    pub manifest: Option<&'a Utf8Path>,
    pub paths: &'a [String],
}

#[derive(Clone, Debug, Serialize)]
pub struct PathResolution {
    pub path: String,
    pub resolution: Resolution,
}

#[derive(Clone, Debug, Serialize)]
pub struct ResolveOutput {
    pub manifest_path: Utf8PathBuf,
    pub diagnostics: Vec<Diagnostic>,
    pub resolutions: Vec<PathResolution>,
    pub metrics: Metrics,
}

pub fn run_resolve(input: ResolveInput<'_>) -> anyhow::Result<ResolveOutput> {
    let loaded = Manager::new(input.registry)
        .load(input.repo_root, input.manifest)
        .context("load mapping manifest")?;
    let mut resolver = Resolver::new(&loaded.effective).context("compile mapping rules")?;

    let resolutions = input
        .paths
        .iter()
        .map(|path| PathResolution {
            path: path.clone(),
            resolution: resolver.resolve(path),
        })
        .collect();

    Ok(ResolveOutput {
        manifest_path: loaded.manifest_path,
        diagnostics: loaded.diagnostics,
        resolutions,
        metrics: resolver.metrics(),
    })
}
