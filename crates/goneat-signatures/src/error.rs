use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("failed to parse signature manifest {origin}: {reason}")]
    Parse { origin: String, reason: String },

    #[error("failed to read signature manifest {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}
