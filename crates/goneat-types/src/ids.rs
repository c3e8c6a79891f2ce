//! Stable identifiers: embedded schema names, env vars and default locations.

// Embedded schema names
pub const SCHEMA_GONEAT_CONFIG_V1: &str = "goneat-config-v1.0.0";
pub const SCHEMA_DATES: &str = "dates";
pub const SCHEMA_HOOKS_MANIFEST_V1: &str = "hooks-manifest-v1.0.0";
pub const SCHEMA_MAPPINGS_MANIFEST_V1: &str = "schema-mappings-v1.0.0";
pub const SCHEMA_SIGNATURES_MANIFEST_V1: &str = "signatures-v1.0.0";

// Manifest versions
pub const MAPPING_MANIFEST_VERSION: &str = "1.0.0";

// Environment
pub const ENV_OFFLINE_SCHEMA_VALIDATION: &str = "GONEAT_OFFLINE_SCHEMA_VALIDATION";
pub const ENV_GONEAT_HOME: &str = "GONEAT_HOME";
pub const ENV_GONEAT_LOG: &str = "GONEAT_LOG";

// Default locations (repo-relative or home-relative)
pub const DEFAULT_MAPPING_MANIFEST: &str = ".goneat/schema-mappings.yaml";
pub const HOME_DIR_NAME: &str = ".goneat";
pub const HOME_SIGNATURES_CONFIG: &str = "config/signatures.yaml";
pub const HOME_SIGNATURES_DIR: &str = "signatures";

// Error context source types
pub const SOURCE_TYPE_FILE: &str = "file";
