//! Fuzz target for mapping manifest parsing.
//!
//! Goal: arbitrary bytes fed through document parsing, manifest
//! deserialization and rule compilation **never panic**.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_manifest_parser
//! ```

#![no_main]

use goneat_mapping::{Manifest, Resolver};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 64 * 1024 {
        return;
    }
    let Ok(value) = goneat_schema::parse_document(data, "fuzz") else {
        return;
    };
    let Ok(manifest) = serde_json::from_value::<Manifest>(value) else {
        return;
    };
    let Ok(mut resolver) = Resolver::new(&manifest) else {
        return;
    };
    for path in [".goneat/config.yaml", "a/b/c.json", "", "..", "x.yml"] {
        let _ = resolver.resolve(path);
    }
});
