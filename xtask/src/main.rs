//! Developer tasks (embedded asset checks, fixture conformance).
//!
//! Keeping this separate avoids bloating the end-user CLI.

use std::sync::Arc;

use anyhow::{Context, bail};
use camino::{Utf8Path, Utf8PathBuf};
use goneat_assets::EmbeddedAssets;
use goneat_mapping::{Manager, Resolver, builtin_manifest};
use goneat_schema::SchemaRegistry;
use goneat_signatures::{Detector, SignatureManifest};
use goneat_types::ids::{DEFAULT_MAPPING_MANIFEST, SCHEMA_SIGNATURES_MANIFEST_V1};
use goneat_types::ValidationResult;
use walkdir::WalkDir;

/// Get the project root (parent of xtask directory).
fn project_root() -> anyhow::Result<Utf8PathBuf> {
    let manifest_dir = Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .map(Utf8Path::to_path_buf)
        .context("xtask has no parent directory")
}

fn fixtures_dir() -> anyhow::Result<Utf8PathBuf> {
    Ok(project_root()?.join("tests").join("fixtures"))
}

fn print_help() {
    eprintln!("xtask commands:");
    eprintln!("  help              Show this message");
    eprintln!("  check-assets      Compile embedded schemas and check builtin manifests (for CI)");
    eprintln!("  print-schema-ids  Print embedded schema names and their asset paths");
    eprintln!("  conform           Load every fixture mapping manifest against the embedded schemas");
}

fn report_failures(what: &str, result: &ValidationResult) -> anyhow::Result<()> {
    if result.valid {
        return Ok(());
    }
    eprintln!("{what} does not match its schema:");
    for err in &result.errors {
        eprintln!("  - {}: {}", err.path, err.message);
    }
    bail!("{what} is invalid")
}

/// Every embedded schema compiles, the builtin mapping manifest loads and its
/// rules compile, and every base signature survives detector construction.
fn check_assets() -> anyhow::Result<()> {
    let registry = SchemaRegistry::embedded();
    let compiled = registry.preload().context("compile embedded schemas")?;
    for name in registry.names() {
        println!("schema ok: {name}");
    }

    let builtin = builtin_manifest().context("load builtin mapping manifest")?;
    Resolver::new(&builtin).context("compile builtin mapping rules")?;
    println!(
        "builtin mappings ok: {} rules, {} exclusions",
        builtin.mappings.len(),
        builtin.exclusions.len()
    );

    let signatures_text = EmbeddedAssets::base_signatures();
    let result = registry
        .validate_bytes(SCHEMA_SIGNATURES_MANIFEST_V1, signatures_text.as_bytes())
        .context("validate base signatures")?;
    report_failures("base signature manifest", &result)?;

    let mut manifest = SignatureManifest::from_yaml(signatures_text, "embedded")?;
    manifest.normalize();
    let detector = Detector::new(&manifest);
    if detector.len() != manifest.signatures.len() {
        bail!(
            "{} of {} base signatures have no usable matcher",
            manifest.signatures.len() - detector.len(),
            manifest.signatures.len()
        );
    }
    println!("signatures ok: {}", detector.len());

    println!("\nAll {compiled} embedded schemas and builtin manifests are consistent.");
    Ok(())
}

/// Every fixture repository carrying a mapping manifest loads cleanly.
fn conform() -> anyhow::Result<()> {
    let registry = Arc::new(SchemaRegistry::embedded());
    let fixtures = fixtures_dir()?;
    let mut failures = Vec::new();
    let mut checked = 0usize;

    for entry in WalkDir::new(&fixtures)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("walk {fixtures}"))?;
        let Some(root) = Utf8Path::from_path(entry.path()) else {
            continue;
        };
        if !root.join(DEFAULT_MAPPING_MANIFEST).is_file() {
            continue;
        }
        checked += 1;
        let outcome = Manager::new(Arc::clone(&registry))
            .load(root, None)
            .map_err(anyhow::Error::from)
            .and_then(|loaded| {
                Resolver::new(&loaded.effective)
                    .map(|_| ())
                    .map_err(anyhow::Error::from)
            });
        match outcome {
            Ok(()) => println!("ok: {root}"),
            Err(err) => failures.push(format!("{root}: {err:#}")),
        }
    }

    if failures.is_empty() {
        println!("\n{checked} fixture manifests conform.");
        Ok(())
    } else {
        for failure in &failures {
            eprintln!("  - {failure}");
        }
        bail!("{} of {checked} fixture manifests failed", failures.len())
    }
}

fn print_schema_ids() {
    let registry = SchemaRegistry::embedded();
    for name in registry.names() {
        match registry.schema_path(&name) {
            Some(path) => println!("{name}\t{path}"),
            None => println!("{name}"),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cmd = args.get(1).map(|s| s.as_str()).unwrap_or("help");

    match cmd {
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        "check-assets" => check_assets(),
        "conform" => conform(),
        "print-schema-ids" => {
            print_schema_ids();
            Ok(())
        }
        other => bail!("unknown xtask command: {other}\n\nRun `cargo xtask help` for usage."),
    }
    .context("xtask failed")
}
