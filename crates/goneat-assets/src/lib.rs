//! Embedded schemas and manifests, addressed by path.
//!
//! The schema engine never reads its builtin assets from disk: it asks an
//! [`AssetProvider`] for bytes by path and for the list of named schemas.
//! [`EmbeddedAssets`] is the provider compiled into the binary;
//! [`StaticAssets`] lets callers (and tests) inject their own.

#![forbid(unsafe_code)]

use std::borrow::Cow;
use std::collections::BTreeMap;

/// Path of the builtin schema mapping manifest.
pub const BUILTIN_MAPPINGS_PATH: &str = "config/schema-mappings.yaml";
/// Path of the base content signature manifest.
pub const BASE_SIGNATURES_PATH: &str = "config/signatures.yaml";

/// A logical schema name and the embedded path that holds its bytes.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SchemaName {
    pub name: String,
    pub path: String,
}

/// Supplies raw schema and manifest bytes by path.
pub trait AssetProvider: Send + Sync {
    fn get_schema(&self, path: &str) -> Option<Cow<'static, [u8]>>;

    /// Every named schema the provider knows about, for eager registry population.
    fn schema_names(&self) -> Vec<SchemaName>;
}

const EMBEDDED: &[(&str, &str)] = &[
    (
        "schemas/config/goneat-config-v1.0.0.yaml",
        include_str!("../assets/schemas/config/goneat-config-v1.0.0.yaml"),
    ),
    (
        "schemas/config/dates-v1.0.0.yaml",
        include_str!("../assets/schemas/config/dates-v1.0.0.yaml"),
    ),
    (
        "schemas/config/hooks-manifest-v1.0.0.yaml",
        include_str!("../assets/schemas/config/hooks-manifest-v1.0.0.yaml"),
    ),
    (
        "schemas/config/schema-mappings-v1.0.0.json",
        include_str!("../assets/schemas/config/schema-mappings-v1.0.0.json"),
    ),
    (
        "schemas/config/signatures-v1.0.0.json",
        include_str!("../assets/schemas/config/signatures-v1.0.0.json"),
    ),
    (
        BUILTIN_MAPPINGS_PATH,
        include_str!("../assets/config/schema-mappings.yaml"),
    ),
    (
        BASE_SIGNATURES_PATH,
        include_str!("../assets/config/signatures.yaml"),
    ),
];

/// Assets compiled into the binary.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbeddedAssets;

impl EmbeddedAssets {
    /// Text of an embedded asset; all embedded assets are UTF-8.
    pub fn text(path: &str) -> Option<&'static str> {
        EMBEDDED
            .iter()
            .find(|(p, _)| *p == path)
            .map(|(_, contents)| *contents)
    }

    pub fn builtin_mappings() -> &'static str {
        Self::text(BUILTIN_MAPPINGS_PATH).unwrap_or_default()
    }

    pub fn base_signatures() -> &'static str {
        Self::text(BASE_SIGNATURES_PATH).unwrap_or_default()
    }
}

impl AssetProvider for EmbeddedAssets {
    fn get_schema(&self, path: &str) -> Option<Cow<'static, [u8]>> {
        Self::text(path).map(|s| Cow::Borrowed(s.as_bytes()))
    }

    fn schema_names(&self) -> Vec<SchemaName> {
        EMBEDDED
            .iter()
            .filter_map(|(path, _)| schema_name_for(path))
            .collect()
    }
}

/// Names derive from the file stem of anything under `schemas/`.
fn schema_name_for(path: &str) -> Option<SchemaName> {
    let rest = path.strip_prefix("schemas/")?;
    let file = rest.rsplit('/').next()?;
    let stem = file
        .strip_suffix(".json")
        .or_else(|| file.strip_suffix(".yaml"))
        .or_else(|| file.strip_suffix(".yml"))?;
    Some(SchemaName {
        name: stem.to_string(),
        path: path.to_string(),
    })
}

/// In-memory provider. Every inserted path under `schemas/` is also a named schema.
#[derive(Clone, Debug, Default)]
pub struct StaticAssets {
    files: BTreeMap<String, Vec<u8>>,
}

impl StaticAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), bytes.into());
    }
}

impl AssetProvider for StaticAssets {
    fn get_schema(&self, path: &str) -> Option<Cow<'static, [u8]>> {
        self.files.get(path).map(|b| Cow::Owned(b.clone()))
    }

    fn schema_names(&self) -> Vec<SchemaName> {
        self.files
            .keys()
            .filter_map(|p| schema_name_for(p))
            .collect()
    }
}
