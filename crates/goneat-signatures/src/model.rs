use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::SignatureError;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.6;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignatureManifest {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub signatures: Vec<Signature>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub id: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub confidence_threshold: f64,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Lower-case, without the leading dot, after [`SignatureManifest::normalize`].
    #[serde(default)]
    pub file_extensions: Vec<String>,
    #[serde(default)]
    pub matchers: Vec<Matcher>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Signature {
    /// Case-insensitive match against the id and every alias.
    pub fn answers_to(&self, name: &str) -> bool {
        self.id.eq_ignore_ascii_case(name) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherKind {
    Contains,
    Prefix,
    Suffix,
    Regex,
}

/// One weighted heuristic. Literal kinds read `value`, regex reads `pattern`;
/// either field is accepted for either kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Matcher {
    #[serde(rename = "type")]
    pub kind: MatcherKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub ignore_case: bool,
}

impl Matcher {
    pub fn text(&self) -> Option<&str> {
        match self.kind {
            MatcherKind::Regex => self.pattern.as_deref().or(self.value.as_deref()),
            _ => self.value.as_deref().or(self.pattern.as_deref()),
        }
    }
}

impl SignatureManifest {
    pub fn from_yaml(text: &str, origin: &str) -> Result<Self, SignatureError> {
        serde_yaml::from_str(text).map_err(|e| SignatureError::Parse {
            origin: origin.to_string(),
            reason: e.to_string(),
        })
    }

    /// Replace signatures with the same id (case-insensitive), append new ones.
    pub fn overlay(&mut self, other: SignatureManifest) {
        for sig in other.signatures {
            match self
                .signatures
                .iter()
                .position(|s| s.id.eq_ignore_ascii_case(&sig.id))
            {
                Some(pos) => {
                    debug!(id = %sig.id, "signature replaced by overlay");
                    self.signatures[pos] = sig;
                }
                None => self.signatures.push(sig),
            }
        }
    }

    pub fn normalize(&mut self) {
        for sig in &mut self.signatures {
            sig.id = sig.id.trim().to_string();
            let mut exts: Vec<String> = Vec::with_capacity(sig.file_extensions.len());
            for ext in &sig.file_extensions {
                let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
                if !ext.is_empty() && !exts.contains(&ext) {
                    exts.push(ext);
                }
            }
            sig.file_extensions = exts;
            if sig.confidence_threshold <= 0.0 {
                sig.confidence_threshold = DEFAULT_CONFIDENCE_THRESHOLD;
            }
            for m in &mut sig.matchers {
                if m.weight <= 0.0 {
                    m.weight = 1.0;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(yaml: &str) -> SignatureManifest {
        SignatureManifest::from_yaml(yaml, "test").expect("parse")
    }

    #[test]
    fn normalize_cleans_extensions_weights_and_thresholds() {
        let mut m = manifest(
            "signatures:\n  - id: ' x '\n    file_extensions: ['.YAML', yml, yaml, '']\n    matchers:\n      - type: contains\n        value: a\n      - type: regex\n        pattern: b\n        weight: -1\n",
        );
        m.normalize();
        let sig = &m.signatures[0];
        assert_eq!(sig.id, "x");
        assert_eq!(sig.file_extensions, vec!["yaml", "yml"]);
        assert_eq!(sig.confidence_threshold, DEFAULT_CONFIDENCE_THRESHOLD);
        assert!(sig.matchers.iter().all(|m| m.weight == 1.0));
    }

    #[test]
    fn overlay_replaces_by_case_insensitive_id() {
        let mut base = manifest(
            "signatures:\n  - id: Compose\n    category: container\n  - id: other\n",
        );
        base.overlay(manifest(
            "signatures:\n  - id: compose\n    category: replaced\n  - id: brand-new\n",
        ));
        let ids: Vec<&str> = base.signatures.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["compose", "other", "brand-new"]);
        assert_eq!(base.signatures[0].category, "replaced");
    }

    #[test]
    fn aliases_answer_case_insensitively() {
        let m = manifest("signatures:\n  - id: github-workflow\n    aliases: [GHA]\n");
        assert!(m.signatures[0].answers_to("gha"));
        assert!(m.signatures[0].answers_to("GitHub-Workflow"));
        assert!(!m.signatures[0].answers_to("gitlab"));
    }

    #[test]
    fn matcher_text_prefers_the_kind_specific_field() {
        let m: Matcher = serde_yaml::from_str("type: regex\npattern: '^a'\n").expect("parse");
        assert_eq!(m.text(), Some("^a"));
        let m: Matcher = serde_yaml::from_str("type: prefix\nvalue: '{'\n").expect("parse");
        assert_eq!(m.text(), Some("{"));
    }
}
