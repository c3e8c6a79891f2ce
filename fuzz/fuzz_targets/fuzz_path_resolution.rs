//! Fuzz target for path resolution against arbitrary rule sets.
//!
//! Goal: glob compilation may fail, but resolution **never panics** and an
//! excluded path is never reported as mapped.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_path_resolution
//! ```

#![no_main]

use arbitrary::Arbitrary;
use goneat_mapping::{ExclusionRule, Manifest, MappingRule, Resolution, Resolver};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct ResolveInput {
    /// (pattern, schema id, priority)
    mappings: Vec<(String, String, i8)>,
    exclusions: Vec<String>,
    candidates: Vec<String>,
}

fuzz_target!(|input: ResolveInput| {
    if input.mappings.len() > 20 || input.exclusions.len() > 10 || input.candidates.len() > 50 {
        return;
    }

    let manifest = Manifest {
        version: "1.0.0".to_string(),
        mappings: input
            .mappings
            .into_iter()
            .filter(|(pattern, _, _)| pattern.len() <= 128)
            .map(|(pattern, schema_id, priority)| MappingRule {
                pattern,
                schema_id,
                priority: i32::from(priority),
                ..MappingRule::default()
            })
            .collect(),
        exclusions: input
            .exclusions
            .into_iter()
            .filter(|pattern| pattern.len() <= 128)
            .map(|pattern| ExclusionRule {
                pattern,
                ..ExclusionRule::default()
            })
            .collect(),
        ..Manifest::default()
    };

    let Ok(mut resolver) = Resolver::new(&manifest) else {
        return;
    };
    let Ok(mut exclusions_only) = Resolver::new(&Manifest {
        mappings: Vec::new(),
        ..manifest.clone()
    }) else {
        return;
    };

    for candidate in input.candidates.iter().filter(|c| c.len() <= 256) {
        let resolution = resolver.resolve(candidate);
        if exclusions_only.resolve(candidate).is_excluded() {
            assert!(!matches!(resolution, Resolution::Mapped(_)));
        }
    }
});
