use camino::Utf8PathBuf;
use goneat_types::BatchResult;
use thiserror::Error;

/// Setup failures of the schema engine.
///
/// Data that does not match a schema is *not* an error; it is reported through
/// [`goneat_types::ValidationResult`].
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to parse {what} as YAML ({yaml}) or JSON ({json})")]
    Format {
        what: &'static str,
        yaml: String,
        json: String,
    },

    #[error("unsupported $schema draft {found:?}: only draft-07 and 2020-12 are supported")]
    UnsupportedDraft { found: String },

    #[error("failed to compile schema {schema}: {reason}")]
    Compile { schema: String, reason: String },

    #[error("conflicting definitions for $id {id}: {existing} and {duplicate} differ")]
    RefConflict {
        id: String,
        existing: Utf8PathBuf,
        duplicate: Utf8PathBuf,
    },

    #[error("cannot scan reference directory {dir}: {reason}")]
    RefDir { dir: Utf8PathBuf, reason: String },

    #[error("schema not found: {0}")]
    NotFound(String),

    #[error("path traversal rejected: {0}")]
    PathTraversal(String),

    #[error("{0} is outside the allowed directories")]
    OutsideAllowedDirs(Utf8PathBuf),

    #[error("{path} is {size} bytes, exceeding the {limit} byte limit")]
    FileTooLarge {
        path: Utf8PathBuf,
        size: u64,
        limit: u64,
    },

    #[error("path is not valid UTF-8: {0}")]
    NonUtf8Path(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot start batch validation: {0}")]
    BatchSetup(String),

    /// Cancellation or deadline; `partial` holds the entries recorded before it.
    #[error("batch validation interrupted: {reason}")]
    BatchInterrupted {
        reason: String,
        partial: Box<BatchResult>,
    },
}

impl SchemaError {
    pub(crate) fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        SchemaError::Io {
            path: path.into(),
            source,
        }
    }
}
