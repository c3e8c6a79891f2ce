//! Fuzz target for content signature detection.
//!
//! Goal: scoring arbitrary snippets against the base signatures **never
//! panics**, and every reported match meets its own threshold.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_signature_detect
//! ```

#![no_main]

use arbitrary::Arbitrary;
use goneat_assets::EmbeddedAssets;
use goneat_signatures::{DetectOptions, Detector, load_manifest};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct DetectInput {
    path: String,
    snippet: Vec<u8>,
    overlay: Option<String>,
}

fuzz_target!(|input: DetectInput| {
    if input.snippet.len() > 64 * 1024 || input.path.len() > 256 {
        return;
    }
    let Ok(mut manifest) = load_manifest(EmbeddedAssets::base_signatures(), None) else {
        return;
    };
    if let Some(text) = input.overlay.as_deref().filter(|t| t.len() <= 8 * 1024) {
        if let Ok(extra) = goneat_signatures::SignatureManifest::from_yaml(text, "fuzz") {
            manifest.overlay(extra);
            manifest.normalize();
        }
    }

    let detector = Detector::new(&manifest);
    for found in detector.detect_all(&input.path, &input.snippet, &DetectOptions::default()) {
        assert!(found.score + 1e-9 >= found.threshold);
    }
});
