use std::cmp::Reverse;
use std::collections::BTreeMap;

use globset::{GlobBuilder, GlobMatcher};
use goneat_types::RepoPath;
use serde::Serialize;

use crate::error::ManifestError;
use crate::model::{ExclusionAction, ExclusionRule, Layer, Manifest, MappingRule, OverrideRule};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MappedSchema {
    pub path: RepoPath,
    pub schema_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub pattern: String,
    pub layer: Layer,
    /// Repository schema file registered for `schema_id` via `overrides`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_source: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExcludedPath {
    pub path: RepoPath,
    pub pattern: String,
    pub action: ExclusionAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_schema: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    Mapped(MappedSchema),
    Excluded(ExcludedPath),
    Unmapped,
}

impl Resolution {
    pub fn schema_id(&self) -> Option<&str> {
        match self {
            Resolution::Mapped(m) => Some(&m.schema_id),
            _ => None,
        }
    }

    pub fn is_excluded(&self) -> bool {
        matches!(self, Resolution::Excluded(_))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub files_evaluated: usize,
    pub mapped: usize,
    pub unmapped: usize,
    pub excluded: usize,
}

/// A glob matched against the full path, then against the file name alone.
#[derive(Clone, Debug)]
struct PathPattern(GlobMatcher);

impl PathPattern {
    fn compile(pattern: &str) -> Result<Self, ManifestError> {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| ManifestError::Glob {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self(glob.compile_matcher()))
    }

    fn is_match(&self, path: &RepoPath) -> bool {
        self.0.is_match(path.as_str()) || self.0.is_match(path.file_name())
    }
}

#[derive(Clone, Debug)]
struct CompiledMapping {
    rule: MappingRule,
    pattern: PathPattern,
}

#[derive(Clone, Debug)]
struct CompiledExclusion {
    rule: ExclusionRule,
    pattern: PathPattern,
}

/// Maps repository paths to schema ids.
///
/// Rules are ordered once at construction: repository before builtin, then
/// higher `priority`, then later declaration. Evaluation is first match.
#[derive(Clone, Debug)]
pub struct Resolver {
    mappings: Vec<CompiledMapping>,
    exclusions: Vec<CompiledExclusion>,
    overrides: BTreeMap<String, OverrideRule>,
    metrics: Metrics,
}

impl Resolver {
    pub fn new(manifest: &Manifest) -> Result<Self, ManifestError> {
        let mut mappings = manifest
            .mappings
            .iter()
            .enumerate()
            .map(|(idx, rule)| {
                Ok((
                    idx,
                    CompiledMapping {
                        rule: rule.clone(),
                        pattern: PathPattern::compile(&rule.pattern)?,
                    },
                ))
            })
            .collect::<Result<Vec<_>, ManifestError>>()?;
        mappings.sort_by_key(|(idx, m)| (Reverse(m.rule.layer), Reverse(m.rule.priority), Reverse(*idx)));

        let mut exclusions = manifest
            .exclusions
            .iter()
            .enumerate()
            .map(|(idx, rule)| {
                Ok((
                    idx,
                    CompiledExclusion {
                        rule: rule.clone(),
                        pattern: PathPattern::compile(&rule.pattern)?,
                    },
                ))
            })
            .collect::<Result<Vec<_>, ManifestError>>()?;
        exclusions.sort_by_key(|(idx, e)| (Reverse(e.rule.layer), Reverse(*idx)));

        // Later overrides replace earlier ones for the same schema id.
        let overrides = manifest
            .overrides
            .iter()
            .map(|o| (o.schema_id.clone(), o.clone()))
            .collect();

        Ok(Self {
            mappings: mappings.into_iter().map(|(_, m)| m).collect(),
            exclusions: exclusions.into_iter().map(|(_, e)| e).collect(),
            overrides,
            metrics: Metrics::default(),
        })
    }

    pub fn resolve(&mut self, path: &str) -> Resolution {
        let path = RepoPath::new(path);
        self.metrics.files_evaluated += 1;

        if let Some(excl) = self.exclusions.iter().find(|e| e.pattern.is_match(&path)) {
            self.metrics.excluded += 1;
            let rule = &excl.rule;
            return Resolution::Excluded(ExcludedPath {
                path,
                pattern: rule.pattern.clone(),
                action: rule.action,
                reason: rule.reason.clone(),
                content_pattern: rule.content_pattern.clone(),
                exclude_schema: rule.exclude_schema.clone(),
            });
        }

        let hit = self
            .mappings
            .iter()
            .filter(|m| !m.rule.schema_id.is_empty())
            .find(|m| m.pattern.is_match(&path));
        match hit {
            Some(mapping) => {
                self.metrics.mapped += 1;
                let rule = &mapping.rule;
                let over = self.overrides.get(&rule.schema_id);
                Resolution::Mapped(MappedSchema {
                    path,
                    schema_id: rule.schema_id.clone(),
                    source: rule.source.clone(),
                    pattern: rule.pattern.clone(),
                    layer: rule.layer,
                    override_path: over.map(|o| o.path.clone()),
                    override_source: over.and_then(|o| o.source.clone()),
                })
            }
            None => {
                self.metrics.unmapped += 1;
                Resolution::Unmapped
            }
        }
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics
    }

    pub fn override_for(&self, schema_id: &str) -> Option<&OverrideRule> {
        self.overrides.get(schema_id)
    }
}
