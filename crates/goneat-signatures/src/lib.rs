//! Content signatures for files that no mapping rule covers.
//!
//! A signature is a weighted bundle of literal and regex matchers. The
//! [`Detector`] scores a file snippet against every admitted signature and
//! reports those whose score reaches their confidence threshold.

#![forbid(unsafe_code)]

mod detect;
mod error;
mod load;
mod model;

pub use detect::{DetectOptions, Detector, Match};
pub use error::SignatureError;
pub use load::{goneat_home, load_default_manifest, load_manifest};
pub use model::{
    DEFAULT_CONFIDENCE_THRESHOLD, Matcher, MatcherKind, Signature, SignatureManifest,
};
