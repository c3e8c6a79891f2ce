use std::path::Path;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

use crate::error::SchemaError;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Constraints applied to every file read by the validation entry points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecurityContext {
    /// A file must resolve to a path under at least one of these.
    pub allowed_dirs: Vec<Utf8PathBuf>,
    /// Upper bound in bytes; `0` disables the check.
    pub max_file_size: u64,
    pub enforce_draft: bool,
}

impl Default for SecurityContext {
    fn default() -> Self {
        Self {
            allowed_dirs: vec![Utf8PathBuf::from(".")],
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            enforce_draft: true,
        }
    }
}

impl SecurityContext {
    pub fn allowing<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Utf8PathBuf>,
    {
        Self {
            allowed_dirs: dirs.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn max_file_size(mut self, limit: u64) -> Self {
        self.max_file_size = limit;
        self
    }

    /// Sanitize `path` and confirm it resolves inside an allowed directory.
    ///
    /// Returns the resolved absolute path.
    pub fn check(&self, path: &Utf8Path) -> Result<Utf8PathBuf, SchemaError> {
        let clean = sanitize_path(path)?;
        let resolved = resolve(&clean)?;
        for dir in &self.allowed_dirs {
            let allowed = resolve(dir)?;
            if resolved.strip_prefix(&allowed).is_ok() {
                return Ok(resolved);
            }
        }
        Err(SchemaError::OutsideAllowedDirs(path.to_path_buf()))
    }

    pub fn check_size(&self, path: &Utf8Path, size: u64) -> Result<(), SchemaError> {
        if self.max_file_size > 0 && size > self.max_file_size {
            return Err(SchemaError::FileTooLarge {
                path: path.to_path_buf(),
                size,
                limit: self.max_file_size,
            });
        }
        Ok(())
    }

    /// Check location and size, then read. Nothing is read from a rejected path.
    pub fn read_file(&self, path: &Utf8Path) -> Result<Vec<u8>, SchemaError> {
        let resolved = self.check(path)?;
        let meta = std::fs::metadata(&resolved).map_err(|e| SchemaError::io(path, e))?;
        self.check_size(path, meta.len())?;
        std::fs::read(&resolved).map_err(|e| SchemaError::io(path, e))
    }
}

/// Reject any path containing a `..` component.
pub fn sanitize_path(path: &Utf8Path) -> Result<Utf8PathBuf, SchemaError> {
    if path.as_str().is_empty() {
        return Err(SchemaError::PathTraversal("empty path".to_string()));
    }
    if path
        .components()
        .any(|c| matches!(c, Utf8Component::ParentDir))
    {
        return Err(SchemaError::PathTraversal(path.to_string()));
    }
    Ok(path.to_path_buf())
}

/// Absolute path with symlinks resolved when the target exists.
fn resolve(path: &Utf8Path) -> Result<Utf8PathBuf, SchemaError> {
    let absolute = std::path::absolute(path).map_err(|e| SchemaError::io(path, e))?;
    let resolved = std::fs::canonicalize(&absolute).unwrap_or(absolute);
    to_utf8(&resolved)
}

fn to_utf8(path: &Path) -> Result<Utf8PathBuf, SchemaError> {
    Utf8PathBuf::from_path_buf(path.to_path_buf())
        .map_err(|p| SchemaError::NonUtf8Path(p.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf8(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 tempdir")
    }

    #[test]
    fn parent_components_are_rejected() {
        for p in ["../etc/passwd", "a/../../b", "a/.."] {
            let err = sanitize_path(Utf8Path::new(p)).expect_err(p);
            assert!(matches!(err, SchemaError::PathTraversal(_)), "{p}");
        }
        assert!(sanitize_path(Utf8Path::new("a/b/./c.yaml")).is_ok());
    }

    #[test]
    fn files_outside_allowed_dirs_are_rejected() {
        let allowed = tempfile::tempdir().expect("tempdir");
        let other = tempfile::tempdir().expect("tempdir");
        let outside = utf8(&other).join("x.yaml");
        std::fs::write(&outside, "a: 1").expect("write");

        let ctx = SecurityContext::allowing([utf8(&allowed)]);
        let err = ctx.check(&outside).expect_err("outside");
        assert!(matches!(err, SchemaError::OutsideAllowedDirs(_)));

        let inside = utf8(&allowed).join("nested/y.yaml");
        std::fs::create_dir_all(utf8(&allowed).join("nested")).expect("mkdir");
        std::fs::write(&inside, "a: 1").expect("write");
        assert!(ctx.check(&inside).is_ok());
    }

    #[test]
    fn oversized_files_are_rejected_before_reading() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let file = utf8(&tmp).join("big.json");
        std::fs::write(&file, vec![b' '; 64]).expect("write");

        let ctx = SecurityContext::allowing([utf8(&tmp)]).max_file_size(16);
        let err = ctx.read_file(&file).expect_err("too large");
        assert!(matches!(err, SchemaError::FileTooLarge { size: 64, limit: 16, .. }));

        let unlimited = SecurityContext::allowing([utf8(&tmp)]).max_file_size(0);
        assert_eq!(unlimited.read_file(&file).expect("read").len(), 64);
    }
}
