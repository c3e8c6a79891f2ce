//! CLI entry point for goneat.
//!
//! Argument parsing, logging setup, JSON output and exit codes only.
//! Everything else lives in `goneat-app`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand, ValueEnum};
use goneat_app::{
    CheckInput, DEFAULT_SNIPPET_BYTES, DetectInput, ResolveInput, SchemaSource, ValidateInput,
    batch_exit_code, run_check, run_detect, run_ids, run_resolve, run_validate,
};
use goneat_assets::EmbeddedAssets;
use goneat_schema::{
    BatchOptions, DEFAULT_MAX_FILE_SIZE, SchemaRegistry, SecurityContext, offline_from_env,
};
use goneat_signatures::{DetectOptions, goneat_home};
use goneat_types::ids::ENV_GONEAT_LOG;
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(
    name = "goneat",
    version,
    about = "Offline schema validation and schema mapping for repository configuration"
)]
struct Cli {
    /// Repository root; mapping manifests and file access are confined to it.
    #[arg(long, default_value = ".", global = true)]
    repo_root: Utf8PathBuf,

    /// Log line format on stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(clap::Args, Debug)]
struct BatchArgs {
    /// Maximum files validated in parallel (defaults to the CPU count).
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Abort the batch after this many seconds.
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Largest file, in bytes, that will be read.
    #[arg(long, default_value_t = DEFAULT_MAX_FILE_SIZE)]
    max_file_size: u64,

    /// Extra directories files may be read from, besides the repository root.
    #[arg(long = "allow-dir")]
    allow_dirs: Vec<Utf8PathBuf>,

    /// Accept schema dialects other than draft-07 and 2020-12.
    #[arg(long)]
    no_enforce_draft: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate data files against one schema.
    Validate {
        /// Name of an embedded schema (e.g. goneat-config-v1.0.0).
        #[arg(long, conflicts_with = "schema_file", required_unless_present = "schema_file")]
        schema: Option<String>,

        /// Path to a schema file (YAML or JSON).
        #[arg(long)]
        schema_file: Option<Utf8PathBuf>,

        /// Directory of schemas that `$ref`s may resolve into (repeatable).
        #[arg(long = "ref-dir")]
        ref_dirs: Vec<Utf8PathBuf>,

        /// Strip `$schema` before compiling (also GONEAT_OFFLINE_SCHEMA_VALIDATION=true).
        #[arg(long)]
        offline: bool,

        #[command(flatten)]
        batch: BatchArgs,

        /// Data files or directories.
        #[arg(required = true)]
        paths: Vec<Utf8PathBuf>,
    },

    /// Show which schema each path maps to.
    Resolve {
        /// Mapping manifest, relative to the repository root.
        #[arg(long)]
        manifest: Option<Utf8PathBuf>,

        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Classify files by content signature.
    Detect {
        /// Only consider these signature ids or aliases (repeatable).
        #[arg(long = "id")]
        ids: Vec<String>,

        /// Only consider these categories (repeatable).
        #[arg(long = "category")]
        categories: Vec<String>,

        /// Report every signature over its threshold, not just the best.
        #[arg(long)]
        all: bool,

        /// Bytes read from the head of each file.
        #[arg(long, default_value_t = DEFAULT_SNIPPET_BYTES)]
        snippet_bytes: usize,

        /// Ignore signature overlays in GONEAT_HOME.
        #[arg(long)]
        no_home: bool,

        #[arg(required = true)]
        paths: Vec<Utf8PathBuf>,
    },

    /// List the `$id`s found in schema directories.
    Ids {
        #[arg(required = true)]
        dirs: Vec<Utf8PathBuf>,
    },

    /// Resolve every repository file and validate the mapped ones.
    Check {
        #[arg(long)]
        manifest: Option<Utf8PathBuf>,

        #[arg(long = "ref-dir")]
        ref_dirs: Vec<Utf8PathBuf>,

        #[arg(long)]
        offline: bool,

        #[command(flatten)]
        batch: BatchArgs,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("goneat error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_env(ENV_GONEAT_LOG).unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().with_writer(std::io::stderr).json())
            .try_init()
            .ok(),
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init()
            .ok(),
    };
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let repo_root = cli
        .repo_root
        .canonicalize_utf8()
        .with_context(|| format!("repo root does not exist: {}", cli.repo_root))?;

    match cli.cmd {
        Commands::Validate {
            schema,
            schema_file,
            ref_dirs,
            offline,
            batch,
            paths,
        } => {
            let source = match (&schema, &schema_file) {
                (_, Some(file)) => SchemaSource::File(file),
                (Some(name), None) => SchemaSource::Embedded(name),
                (None, None) => anyhow::bail!("either --schema or --schema-file is required"),
            };
            let offline = offline || offline_from_env();
            debug!(
                offline,
                ref_dirs = ref_dirs.len(),
                paths = paths.len(),
                "validate"
            );
            let output = run_validate(ValidateInput {
                registry: Arc::new(SchemaRegistry::embedded()),
                schema: source,
                ref_dirs: &ref_dirs,
                paths: &paths,
                offline,
                batch: batch_options(&repo_root, &batch),
            })?;
            print_json(&output)?;
            Ok(batch_exit_code(&output.batch))
        }
        Commands::Resolve { manifest, paths } => {
            debug!(repo_root = %repo_root, paths = paths.len(), "resolve");
            let output = run_resolve(ResolveInput {
                registry: Arc::new(SchemaRegistry::embedded()),
                repo_root: &repo_root,
                manifest: manifest.as_deref(),
                paths: &paths,
            })?;
            print_json(&output)?;
            Ok(0)
        }
        Commands::Detect {
            ids,
            categories,
            all,
            snippet_bytes,
            no_home,
            paths,
        } => {
            let home = if no_home { None } else { goneat_home() };
            let output = run_detect(DetectInput {
                paths: &paths,
                base_manifest: EmbeddedAssets::base_signatures(),
                goneat_home: home.as_deref(),
                options: DetectOptions { ids, categories },
                all,
                snippet_bytes,
            })?;
            print_json(&output)?;
            Ok(0)
        }
        Commands::Ids { dirs } => {
            print_json(&run_ids(&dirs)?)?;
            Ok(0)
        }
        Commands::Check {
            manifest,
            ref_dirs,
            offline,
            batch,
        } => {
            let offline = offline || offline_from_env();
            debug!(offline, repo_root = %repo_root, "check");
            let report = run_check(CheckInput {
                registry: Arc::new(SchemaRegistry::embedded()),
                repo_root: &repo_root,
                manifest: manifest.as_deref(),
                ref_dirs: &ref_dirs,
                offline,
                batch: batch_options(&repo_root, &batch),
            })?;
            print_json(&report)?;
            Ok(batch_exit_code(&report.batch))
        }
    }
}

fn batch_options(repo_root: &Utf8Path, args: &BatchArgs) -> BatchOptions {
    let mut allowed_dirs = vec![repo_root.to_path_buf()];
    allowed_dirs.extend(args.allow_dirs.iter().cloned());
    let defaults = BatchOptions::default();
    BatchOptions {
        max_concurrency: args.max_concurrency.unwrap_or(defaults.max_concurrency),
        timeout: Some(Duration::from_secs(args.timeout_secs)),
        security: SecurityContext {
            allowed_dirs,
            max_file_size: args.max_file_size,
            enforce_draft: !args.no_enforce_draft,
        },
        cancel: None,
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{text}");
    Ok(())
}
