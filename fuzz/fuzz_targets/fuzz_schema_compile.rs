//! Fuzz target for schema normalization and compilation.
//!
//! Goal: arbitrary schema and instance bytes **never panic** and never
//! trigger a network fetch; compile errors are fine.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_schema_compile
//! ```

#![no_main]

use arbitrary::Arbitrary;
use goneat_schema::{CompileOptions, compile_schema_with};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct CompileInput {
    schema: Vec<u8>,
    instance: Vec<u8>,
    offline: bool,
}

fuzz_target!(|input: CompileInput| {
    if input.schema.len() > 16 * 1024 || input.instance.len() > 16 * 1024 {
        return;
    }
    let options = CompileOptions::default().offline(input.offline);
    let Ok(schema) = compile_schema_with(&input.schema, &options) else {
        return;
    };
    if let Ok(result) = schema.validate_bytes(&input.instance) {
        assert_eq!(result.valid, result.errors.is_empty());
    }
});
