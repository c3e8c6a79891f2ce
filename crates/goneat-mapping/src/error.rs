use camino::Utf8PathBuf;
use goneat_schema::SchemaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest path {path} escapes the repository root {root}")]
    OutsideRepo { path: Utf8PathBuf, root: Utf8PathBuf },

    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest {path}: {reason}")]
    Parse { path: Utf8PathBuf, reason: String },

    #[error("manifest {path} does not match the schema-mappings schema: {}", errors.join("; "))]
    Invalid {
        path: Utf8PathBuf,
        errors: Vec<String>,
    },

    #[error("manifest {path} declares unsupported version {found:?} (expected {expected:?})")]
    UnsupportedVersion {
        path: Utf8PathBuf,
        found: String,
        expected: &'static str,
    },

    #[error("invalid glob {pattern:?}: {source}")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("builtin mapping manifest is unusable: {0}")]
    Builtin(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}
