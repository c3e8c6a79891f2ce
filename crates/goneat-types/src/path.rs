use camino::Utf8Path;
use serde::{Deserialize, Serialize};

/// A repository-relative path as the mapping resolver sees it.
///
/// Backslashes become `/`, any run of leading `./` is dropped, and an empty
/// path is spelled `.`. Glob patterns in mapping manifests are always matched
/// against this form.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoPath(String);

impl RepoPath {
    pub fn new(raw: impl AsRef<str>) -> Self {
        let slashed = raw.as_ref().replace('\\', "/");
        let mut rest = slashed.as_str();
        while let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
        }
        match rest {
            "" => Self(".".to_string()),
            other => Self(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last segment; the whole path when it has no `/`.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Extension of [`Self::file_name`], ASCII lower-cased, without the dot.
    /// Dotfiles such as `.hidden` have none.
    pub fn extension_lower(&self) -> Option<String> {
        Utf8Path::new(self.file_name())
            .extension()
            .filter(|ext| !ext.is_empty())
            .map(|ext| ext.to_ascii_lowercase())
    }
}

impl std::fmt::Display for RepoPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Utf8Path> for RepoPath {
    fn from(path: &Utf8Path) -> Self {
        Self::new(path.as_str())
    }
}

impl From<&str> for RepoPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}
