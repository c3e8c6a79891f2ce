//! Bounded-concurrency validation of many files against one schema.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use goneat_types::{BatchResult, ValidationResult};
use rayon::prelude::*;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::compile::CompiledSchema;
use crate::error::SchemaError;
use crate::file::{file_context, validate_file};
use crate::messages::ROOT_PATH;
use crate::security::SecurityContext;

pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(30);

const DATA_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

#[derive(Clone, Debug)]
pub struct BatchOptions {
    pub max_concurrency: usize,
    /// Deadline for the whole batch; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub security: SecurityContext,
    /// Set to `true` from any thread to stop scheduling further files.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            timeout: Some(DEFAULT_BATCH_TIMEOUT),
            security: SecurityContext::default(),
            cancel: None,
        }
    }
}

impl BatchOptions {
    pub fn with_security(mut self, security: SecurityContext) -> Self {
        self.security = security;
        self
    }

    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }
}

struct Interrupt {
    deadline: Option<Instant>,
    cancel: Option<Arc<AtomicBool>>,
}

impl Interrupt {
    fn reason(&self) -> Option<&'static str> {
        if self
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
        {
            return Some("cancelled");
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Some("timed out");
        }
        None
    }
}

/// Validate every path against `schema`.
///
/// Per-file failures (unreadable, rejected by the security context,
/// unparseable) become invalid entries; only cancellation or the deadline
/// aborts the batch. A path listed more than once is validated once.
pub fn validate_files<P>(
    schema: &CompiledSchema,
    paths: &[P],
    options: &BatchOptions,
) -> Result<BatchResult, SchemaError>
where
    P: AsRef<Utf8Path> + Sync,
{
    let interrupt = Interrupt {
        deadline: options.timeout.map(|t| Instant::now() + t),
        cancel: options.cancel.clone(),
    };
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.max_concurrency.max(1))
        .build()
        .map_err(|e| SchemaError::BatchSetup(e.to_string()))?;
    let mut seen = HashSet::new();
    let paths: Vec<&Utf8Path> = paths
        .iter()
        .map(P::as_ref)
        .filter(|&path| {
            let first = seen.insert(path);
            if !first {
                debug!(%path, "skipping duplicate input path");
            }
            first
        })
        .collect();
    debug!(
        schema = schema.name(),
        files = paths.len(),
        workers = options.max_concurrency.max(1),
        "starting batch validation"
    );

    let shared = Mutex::new(BatchResult::new(paths.len()));
    let dropped = AtomicUsize::new(0);
    pool.install(|| {
        paths.par_iter().for_each(|path| {
            if interrupt.reason().is_some() {
                dropped.fetch_add(1, Ordering::Relaxed);
                return;
            }
            let result = validate_one(schema, path, &options.security);
            if interrupt.reason().is_some() {
                dropped.fetch_add(1, Ordering::Relaxed);
                return;
            }
            shared
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .record(path.as_str(), result);
        });
    });

    let batch = shared.into_inner().unwrap_or_else(PoisonError::into_inner);
    if dropped.load(Ordering::Relaxed) > 0 {
        let reason = interrupt.reason().unwrap_or("interrupted");
        warn!(
            reason,
            completed = batch.valid_files + batch.invalid_files,
            total = batch.total_files,
            "batch validation interrupted"
        );
        return Err(SchemaError::BatchInterrupted {
            reason: reason.to_string(),
            partial: Box::new(batch),
        });
    }
    Ok(batch)
}

fn validate_one(
    schema: &CompiledSchema,
    path: &Utf8Path,
    security: &SecurityContext,
) -> ValidationResult {
    match validate_file(schema, path, security) {
        Ok(result) => result,
        Err(e) => {
            debug!(%path, error = %e, "file could not be validated");
            ValidationResult::failure(ROOT_PATH, e.to_string()).with_context(file_context(path))
        }
    }
}

/// Validate every `.json`, `.yaml` and `.yml` file under `dir`, in sorted order.
pub fn validate_directory(
    schema: &CompiledSchema,
    dir: &Utf8Path,
    options: &BatchOptions,
) -> Result<BatchResult, SchemaError> {
    let files = collect_data_files(dir)?;
    validate_files(schema, &files, options)
}

fn collect_data_files(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, SchemaError> {
    let mut files = Vec::new();
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
        let is_data = path
            .extension()
            .is_some_and(|ext| DATA_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)));
        if is_data {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}
