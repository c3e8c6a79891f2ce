//! Use case orchestration for goneat.
//!
//! Each use case wires the schema, mapping, and signature crates together
//! and returns a serializable result. The CLI only parses arguments, prints,
//! and maps results to exit codes.

#![forbid(unsafe_code)]

mod check;
mod detect;
mod ids;
mod resolve;
mod validate;

pub use check::{CheckInput, CheckReport, batch_exit_code, run_check};
pub use detect::{DEFAULT_SNIPPET_BYTES, DetectInput, FileDetection, run_detect};
pub use ids::{IdListing, run_ids};
pub use resolve::{PathResolution, ResolveInput, ResolveOutput, run_resolve};
pub use validate::{SchemaSource, ValidateInput, ValidateOutput, run_validate};
