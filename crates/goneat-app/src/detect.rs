use std::io::Read;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use goneat_signatures::{DetectOptions, Detector, Match, load_manifest};
use serde::Serialize;

/// Bytes read from the head of each file.
pub const DEFAULT_SNIPPET_BYTES: usize = 64 * 1024;

#[derive(Clone, Debug)]
pub struct DetectInput<'a> {
    pub paths: &'a [Utf8PathBuf],
    /// Base manifest text, usually the embedded one.
    pub base_manifest: &'a str,
    /// Overlay root; `None` skips user overlays.
    pub goneat_home: Option<&'a Utf8Path>,
    pub options: DetectOptions,
    /// Report every signature over threshold instead of the best one.
    pub all: bool,
    pub snippet_bytes: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct FileDetection {
    pub path: String,
    pub matches: Vec<Match>,
}

pub fn run_detect(input: DetectInput<'_>) -> anyhow::Result<Vec<FileDetection>> {
    let manifest =
        load_manifest(input.base_manifest, input.goneat_home).context("load signature manifest")?;
    let detector = Detector::new(&manifest);

    input
        .paths
        .iter()
        .map(|path| {
            let snippet = read_snippet(path, input.snippet_bytes)
                .with_context(|| format!("read {path}"))?;
            let matches = if input.all {
                detector.detect_all(path.as_str(), &snippet, &input.options)
            } else {
                detector
                    .detect(path.as_str(), &snippet, &input.options)
                    .into_iter()
                    .collect()
            };
            Ok(FileDetection {
                path: path.to_string(),
                matches,
            })
        })
        .collect()
}

fn read_snippet(path: &Utf8Path, limit: usize) -> std::io::Result<Vec<u8>> {
    let file = std::fs::File::open(path)?;
    let mut buf = Vec::new();
    file.take(limit as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use goneat_assets::EmbeddedAssets;

    #[test]
    fn detects_workflow_from_embedded_signatures() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf8");
        let wf = root.join("ci.yml");
        std::fs::write(
            &wf,
            "name: ci\non:\n  push:\njobs:\n  test:\n    runs-on: ubuntu-latest\n",
        )
        .expect("write");

        let out = run_detect(DetectInput {
            paths: std::slice::from_ref(&wf),
            base_manifest: EmbeddedAssets::base_signatures(),
            goneat_home: None,
            options: DetectOptions::default(),
            all: false,
            snippet_bytes: DEFAULT_SNIPPET_BYTES,
        })
        .expect("detect");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].matches[0].id, "github-workflow");
    }

    #[test]
    fn snippet_is_bounded() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf8");
        let file = root.join("big.txt");
        std::fs::write(&file, vec![b'a'; 4096]).expect("write");
        assert_eq!(read_snippet(&file, 100).expect("read").len(), 100);
    }
}
