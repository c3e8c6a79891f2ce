use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use goneat_assets::{AssetProvider, EmbeddedAssets};
use goneat_types::ValidationResult;
use goneat_types::ids::{
    SCHEMA_DATES, SCHEMA_GONEAT_CONFIG_V1, SCHEMA_HOOKS_MANIFEST_V1, SCHEMA_MAPPINGS_MANIFEST_V1,
    SCHEMA_SIGNATURES_MANIFEST_V1,
};
use serde_json::Value;
use tracing::debug;

use crate::compile::{CompileOptions, CompiledSchema, compile_named};
use crate::error::SchemaError;

/// Names that predate path discovery, kept so older callers keep resolving.
const LEGACY_SCHEMA_PATHS: &[(&str, &str)] = &[
    (
        SCHEMA_GONEAT_CONFIG_V1,
        "schemas/config/goneat-config-v1.0.0.yaml",
    ),
    (SCHEMA_DATES, "schemas/config/dates-v1.0.0.yaml"),
    (
        SCHEMA_HOOKS_MANIFEST_V1,
        "schemas/config/hooks-manifest-v1.0.0.yaml",
    ),
    (
        SCHEMA_MAPPINGS_MANIFEST_V1,
        "schemas/config/schema-mappings-v1.0.0.json",
    ),
    (
        SCHEMA_SIGNATURES_MANIFEST_V1,
        "schemas/config/signatures-v1.0.0.json",
    ),
];

pub fn legacy_schema_path(name: &str) -> Option<&'static str> {
    LEGACY_SCHEMA_PATHS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, p)| *p)
}

/// Named schemas backed by an [`AssetProvider`], compiled lazily and cached.
///
/// The name table is fixed at construction; the compiled cache only grows.
pub struct SchemaRegistry {
    assets: Arc<dyn AssetProvider>,
    paths: BTreeMap<String, String>,
    options: CompileOptions,
    cache: RwLock<HashMap<String, Arc<CompiledSchema>>>,
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("paths", &self.paths)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SchemaRegistry {
    pub fn new(assets: Arc<dyn AssetProvider>) -> Self {
        Self::with_options(assets, CompileOptions::from_env())
    }

    pub fn with_options(assets: Arc<dyn AssetProvider>, options: CompileOptions) -> Self {
        let paths = assets
            .schema_names()
            .into_iter()
            .map(|n| (n.name, n.path))
            .collect();
        Self {
            assets,
            paths,
            options,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Registry over the schemas compiled into the binary.
    pub fn embedded() -> Self {
        Self::new(Arc::new(EmbeddedAssets))
    }

    /// Discovered and legacy names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.paths.keys().cloned().collect();
        for (legacy, path) in LEGACY_SCHEMA_PATHS {
            if self.assets.get_schema(path).is_some() && !self.paths.contains_key(*legacy) {
                names.push((*legacy).to_string());
            }
        }
        names.sort();
        names
    }

    pub fn schema_path(&self, name: &str) -> Option<&str> {
        self.paths
            .get(name)
            .map(String::as_str)
            .or_else(|| legacy_schema_path(name))
    }

    pub fn schema_bytes(&self, name: &str) -> Result<Cow<'static, [u8]>, SchemaError> {
        self.schema_path(name)
            .and_then(|path| self.assets.get_schema(path))
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))
    }

    /// Options every cached validator was compiled with.
    pub fn options(&self) -> CompileOptions {
        self.options
    }

    /// Compile `name` with `options`, bypassing the cache.
    pub fn compile_with(
        &self,
        name: &str,
        options: &CompileOptions,
    ) -> Result<CompiledSchema, SchemaError> {
        let bytes = self.schema_bytes(name)?;
        compile_named(Some(name), &bytes, options)
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.read_cache().contains_key(name)
    }

    pub fn get_validator(&self, name: &str) -> Result<Arc<CompiledSchema>, SchemaError> {
        if let Some(hit) = self.read_cache().get(name) {
            return Ok(Arc::clone(hit));
        }

        debug!(schema = name, "schema cache miss");
        let bytes = self.schema_bytes(name)?;
        let compiled = Arc::new(compile_named(Some(name), &bytes, &self.options)?);

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(cache.entry(name.to_string()).or_insert(compiled)))
    }

    /// Compile every discovered schema up front. Returns how many are cached.
    pub fn preload(&self) -> Result<usize, SchemaError> {
        for name in self.paths.keys() {
            self.get_validator(name)?;
        }
        Ok(self.read_cache().len())
    }

    pub fn validate_bytes(&self, name: &str, data: &[u8]) -> Result<ValidationResult, SchemaError> {
        self.get_validator(name)?.validate_bytes(data)
    }

    pub fn validate_value(&self, name: &str, data: &Value) -> Result<ValidationResult, SchemaError> {
        Ok(self.get_validator(name)?.validate(data))
    }

    fn read_cache(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<CompiledSchema>>> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goneat_assets::StaticAssets;

    #[test]
    fn embedded_schemas_all_compile() {
        let registry = SchemaRegistry::embedded();
        let loaded = registry.preload().expect("preload");
        assert!(loaded >= 5);
    }

    #[test]
    fn legacy_names_resolve() {
        let registry = SchemaRegistry::embedded();
        assert!(registry.names().contains(&"dates".to_string()));
        let schema = registry.get_validator("dates").expect("dates");
        assert_eq!(schema.name(), "dates");
        assert!(registry.is_cached("dates"));
    }

    #[test]
    fn unknown_name_is_not_found() {
        let registry = SchemaRegistry::embedded();
        let err = registry.get_validator("nope-v9").expect_err("unknown");
        assert!(matches!(err, SchemaError::NotFound(name) if name == "nope-v9"));
    }

    #[test]
    fn config_schema_rejects_unknown_keys() {
        let registry = SchemaRegistry::embedded();
        let ok = registry
            .validate_bytes(SCHEMA_GONEAT_CONFIG_V1, b"version: 1.0.0\nschema:\n  offline: true\n")
            .expect("validate");
        assert!(ok.valid, "{:?}", ok.errors);
        let bad = registry
            .validate_bytes(SCHEMA_GONEAT_CONFIG_V1, b"version: 1.0.0\nbogus: 1\n")
            .expect("validate");
        assert!(!bad.valid);
    }

    #[test]
    fn concurrent_lookups_share_one_compiled_schema() {
        let assets = StaticAssets::new().with("schemas/app/app-v1.json", br#"{"type":"object"}"#.to_vec());
        let registry = SchemaRegistry::with_options(Arc::new(assets), CompileOptions::default());

        let schemas: Vec<Arc<CompiledSchema>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| registry.get_validator("app-v1").expect("compile")))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("join"))
                .collect()
        });
        let cached = registry.get_validator("app-v1").expect("cached");
        assert!(schemas.iter().all(|s| Arc::ptr_eq(s, &cached)));
    }
}
