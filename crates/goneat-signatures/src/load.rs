use camino::{Utf8Path, Utf8PathBuf};
use goneat_assets::EmbeddedAssets;
use goneat_types::ids::{ENV_GONEAT_HOME, HOME_DIR_NAME, HOME_SIGNATURES_CONFIG, HOME_SIGNATURES_DIR};
use tracing::{debug, info};

use crate::error::SignatureError;
use crate::model::SignatureManifest;

/// `$GONEAT_HOME`, else `~/.goneat`.
pub fn goneat_home() -> Option<Utf8PathBuf> {
    if let Ok(home) = std::env::var(ENV_GONEAT_HOME) {
        let home = home.trim();
        if !home.is_empty() {
            return Some(Utf8PathBuf::from(home));
        }
    }
    let home = dirs::home_dir()?;
    Utf8PathBuf::from_path_buf(home.join(HOME_DIR_NAME)).ok()
}

/// Base manifest, then `<home>/config/signatures.yaml`, then every
/// `<home>/signatures/*.yaml` in file name order. The result is normalized.
pub fn load_manifest(
    base_yaml: &str,
    goneat_home: Option<&Utf8Path>,
) -> Result<SignatureManifest, SignatureError> {
    let mut manifest = SignatureManifest::from_yaml(base_yaml, "embedded")?;
    if let Some(home) = goneat_home {
        for path in overlay_files(home)? {
            let text = std::fs::read_to_string(&path).map_err(|source| SignatureError::Read {
                path: path.clone(),
                source,
            })?;
            let overlay = SignatureManifest::from_yaml(&text, path.as_str())?;
            info!(%path, signatures = overlay.signatures.len(), "loaded signature overlay");
            manifest.overlay(overlay);
        }
    }
    manifest.normalize();
    Ok(manifest)
}

/// The embedded base manifest with overlays from [`goneat_home`].
pub fn load_default_manifest() -> Result<SignatureManifest, SignatureError> {
    load_manifest(EmbeddedAssets::base_signatures(), goneat_home().as_deref())
}

fn overlay_files(home: &Utf8Path) -> Result<Vec<Utf8PathBuf>, SignatureError> {
    let mut files = Vec::new();
    let config = home.join(HOME_SIGNATURES_CONFIG);
    if config.is_file() {
        files.push(config);
    }

    let dir = home.join(HOME_SIGNATURES_DIR);
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(%dir, "no signature overlay directory");
            return Ok(files);
        }
        Err(source) => return Err(SignatureError::Read { path: dir, source }),
    };
    let mut extra = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| SignatureError::Read {
            path: dir.clone(),
            source,
        })?;
        let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
            continue;
        };
        let is_yaml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
        if is_yaml && path.is_file() {
            extra.push(path);
        }
    }
    extra.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    files.extend(extra);
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn home() -> (tempfile::TempDir, Utf8PathBuf) {
        let tmp = tempfile::tempdir().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf8");
        (tmp, root)
    }

    const BASE: &str = "version: '1.0.0'\nsignatures:\n  - id: alpha\n    category: base\n    matchers:\n      - type: contains\n        value: a\n";

    #[test]
    fn base_only_without_home() {
        let m = load_manifest(BASE, None).expect("load");
        assert_eq!(m.signatures.len(), 1);
        assert_eq!(m.signatures[0].confidence_threshold, 0.6);
    }

    #[test]
    fn overlays_apply_config_then_sorted_directory_files() {
        let (_tmp, home) = home();
        std::fs::create_dir_all(home.join("config")).expect("mkdir");
        std::fs::create_dir_all(home.join("signatures")).expect("mkdir");
        std::fs::write(
            home.join("config/signatures.yaml"),
            "signatures:\n  - id: ALPHA\n    category: from-config\n",
        )
        .expect("write");
        std::fs::write(
            home.join("signatures/20-late.yml"),
            "signatures:\n  - id: alpha\n    category: from-late\n",
        )
        .expect("write");
        std::fs::write(
            home.join("signatures/10-early.yaml"),
            "signatures:\n  - id: alpha\n    category: from-early\n  - id: beta\n",
        )
        .expect("write");
        std::fs::write(home.join("signatures/notes.txt"), "ignored").expect("write");

        let m = load_manifest(BASE, Some(&home)).expect("load");
        let ids: Vec<&str> = m.signatures.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "beta"]);
        assert_eq!(m.signatures[0].category, "from-late");
    }

    #[test]
    fn broken_overlay_names_its_file() {
        let (_tmp, home) = home();
        std::fs::create_dir_all(home.join("signatures")).expect("mkdir");
        std::fs::write(home.join("signatures/bad.yaml"), "signatures: [").expect("write");
        let err = load_manifest(BASE, Some(&home)).expect_err("parse");
        assert!(err.to_string().contains("bad.yaml"));
    }

    #[test]
    fn embedded_base_manifest_loads() {
        let m = load_manifest(EmbeddedAssets::base_signatures(), None).expect("load");
        assert!(m.signatures.iter().any(|s| s.id == "github-workflow"));
    }
}
