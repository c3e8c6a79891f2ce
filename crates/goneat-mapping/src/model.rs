use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema mapping manifest v1 (`.goneat/schema-mappings.yaml`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,

    #[serde(default)]
    pub config: ConfigSettings,

    #[serde(default)]
    pub mappings: Vec<MappingRule>,

    #[serde(default)]
    pub exclusions: Vec<ExclusionRule>,

    #[serde(default)]
    pub overrides: Vec<OverrideRule>,
}

impl Manifest {
    /// Builtin rules first, overlay rules appended. Config merges field by field.
    pub fn merge(&self, overlay: &Manifest) -> Manifest {
        let mut effective = self.clone();
        effective.config = self.config.merge(&overlay.config);
        effective.mappings.extend(overlay.mappings.iter().cloned());
        effective.exclusions.extend(overlay.exclusions.iter().cloned());
        effective.overrides.extend(overlay.overrides.iter().cloned());
        effective
    }

    /// Tag every rule with the layer it was loaded from.
    pub fn with_layer(mut self, layer: Layer) -> Self {
        for m in &mut self.mappings {
            m.layer = layer;
        }
        for e in &mut self.exclusions {
            e.layer = layer;
        }
        self
    }
}

/// Tri-state settings: `None` means "not set here", so an overlay can leave a
/// builtin value alone or explicitly set it either way.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_detect: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn_unmapped: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f64>,
}

impl ConfigSettings {
    pub fn merge(&self, overlay: &ConfigSettings) -> ConfigSettings {
        ConfigSettings {
            auto_detect: overlay.auto_detect.or(self.auto_detect),
            strict: overlay.strict.or(self.strict),
            warn_unmapped: overlay.warn_unmapped.or(self.warn_unmapped),
            min_confidence: overlay.min_confidence.or(self.min_confidence),
        }
    }

    pub fn auto_detect(&self) -> bool {
        self.auto_detect.unwrap_or(false)
    }

    pub fn strict(&self) -> bool {
        self.strict.unwrap_or(false)
    }

    pub fn warn_unmapped(&self) -> bool {
        self.warn_unmapped.unwrap_or(true)
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence.unwrap_or(0.6)
    }
}

/// Where a rule came from. Repository rules outrank builtin ones.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    #[default]
    Builtin,
    Repository,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InferenceMethod {
    Content,
    MetaSchema,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingRule {
    /// Doublestar glob: `*` stays within a segment, `**` crosses directories.
    pub pattern: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub schema_id: String,

    /// Declared but not acted on: rules without `schema_id` never map a path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference_method: Option<InferenceMethod>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default)]
    pub priority: i32,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub conditions: BTreeMap<String, serde_json::Value>,

    #[serde(skip)]
    pub layer: Layer,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionAction {
    #[default]
    Skip,
    /// Currently handled exactly like `Skip`.
    RetryInference,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExclusionRule {
    pub pattern: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_schema: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default)]
    pub action: ExclusionAction,

    #[serde(skip)]
    pub layer: Layer,
}

/// Points a schema id at a schema file inside the repository.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRule {
    pub schema_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_config_wins_only_where_set() {
        let builtin = ConfigSettings {
            auto_detect: Some(false),
            strict: Some(false),
            warn_unmapped: Some(true),
            min_confidence: Some(0.6),
        };
        let overlay = ConfigSettings {
            strict: Some(true),
            warn_unmapped: Some(false),
            ..ConfigSettings::default()
        };
        let merged = builtin.merge(&overlay);
        assert_eq!(merged.auto_detect, Some(false));
        assert_eq!(merged.strict, Some(true));
        assert_eq!(merged.warn_unmapped, Some(false));
        assert_eq!(merged.min_confidence, Some(0.6));
    }

    #[test]
    fn unset_settings_fall_back_to_defaults() {
        let cfg = ConfigSettings::default();
        assert!(!cfg.auto_detect());
        assert!(!cfg.strict());
        assert!(cfg.warn_unmapped());
        assert_eq!(cfg.min_confidence(), 0.6);
    }

    #[test]
    fn merge_appends_overlay_rules() {
        let builtin: Manifest = serde_yaml::from_str(
            "version: '1.0.0'\nmappings:\n  - pattern: a.yaml\n    schema_id: a\n",
        )
        .expect("parse");
        let overlay: Manifest = serde_yaml::from_str(
            "version: '1.0.0'\nmappings:\n  - pattern: b.yaml\n    schema_id: b\noverrides:\n  - schema_id: b\n    path: schemas/b.json\n",
        )
        .expect("parse");
        let merged = builtin.merge(&overlay.with_layer(Layer::Repository));
        assert_eq!(merged.mappings.len(), 2);
        assert_eq!(merged.mappings[1].layer, Layer::Repository);
        assert_eq!(merged.overrides.len(), 1);
    }

    #[test]
    fn actions_and_methods_use_manifest_spelling() {
        let rule: ExclusionRule =
            serde_yaml::from_str("pattern: x/**\naction: retry_inference\n").expect("parse");
        assert_eq!(rule.action, ExclusionAction::RetryInference);
        let mapping: MappingRule =
            serde_yaml::from_str("pattern: '*.json'\ninference_method: meta-schema\n")
                .expect("parse");
        assert_eq!(mapping.inference_method, Some(InferenceMethod::MetaSchema));
        assert!(mapping.schema_id.is_empty());
    }
}
