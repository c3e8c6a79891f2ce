use std::collections::BTreeMap;

use goneat_types::RepoPath;
use regex::bytes::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::warn;

use crate::model::{MatcherKind, Signature, SignatureManifest};

/// Allow-lists; an empty list admits everything.
#[derive(Clone, Debug, Default)]
pub struct DetectOptions {
    /// Compared case-insensitively against ids and aliases.
    pub ids: Vec<String>,
    pub categories: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Match {
    pub id: String,
    pub category: String,
    pub score: f64,
    pub threshold: f64,
    pub matched: usize,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug)]
enum Test {
    Contains(Vec<u8>),
    Prefix(Vec<u8>),
    Suffix(Vec<u8>),
    Regex(Regex),
}

#[derive(Debug)]
struct CompiledMatcher {
    test: Test,
    ignore_case: bool,
    weight: f64,
}

impl CompiledMatcher {
    /// `lowered` is the ASCII-lower-cased snippet, used by case-insensitive literals.
    /// Prefix and suffix tests skip leading and trailing ASCII whitespace.
    fn fires(&self, snippet: &[u8], lowered: &[u8]) -> bool {
        let haystack = if self.ignore_case { lowered } else { snippet };
        match &self.test {
            Test::Contains(needle) => contains(haystack, needle),
            Test::Prefix(needle) => haystack.trim_ascii_start().starts_with(needle),
            Test::Suffix(needle) => haystack.trim_ascii_end().ends_with(needle),
            Test::Regex(re) => re.is_match(snippet),
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

#[derive(Debug)]
struct CompiledSignature {
    signature: Signature,
    matchers: Vec<CompiledMatcher>,
}

impl CompiledSignature {
    fn score(&self, snippet: &[u8], lowered: &[u8]) -> (f64, usize) {
        let mut total = 0.0;
        let mut fired = 0;
        for m in &self.matchers {
            if m.fires(snippet, lowered) {
                total += m.weight;
                fired += 1;
            }
        }
        (total.clamp(0.0, 1.0), fired)
    }

    fn admits_extension(&self, ext: Option<&str>) -> bool {
        let wanted = &self.signature.file_extensions;
        wanted.is_empty() || ext.is_some_and(|e| wanted.iter().any(|w| w == e))
    }

    fn admitted_by(&self, options: &DetectOptions) -> bool {
        let sig = &self.signature;
        let id_ok = options.ids.is_empty() || options.ids.iter().any(|id| sig.answers_to(id));
        let category_ok = options.categories.is_empty()
            || options
                .categories
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&sig.category));
        id_ok && category_ok
    }
}

/// Classifies file snippets against a compiled signature manifest.
#[derive(Debug)]
pub struct Detector {
    signatures: Vec<CompiledSignature>,
}

impl Detector {
    /// Matchers that fail to compile are dropped; so are signatures left with none.
    pub fn new(manifest: &SignatureManifest) -> Self {
        let signatures = manifest
            .signatures
            .iter()
            .filter_map(|sig| {
                let matchers: Vec<CompiledMatcher> = sig
                    .matchers
                    .iter()
                    .enumerate()
                    .filter_map(|(idx, m)| match compile_matcher(m.kind, m.text(), m.ignore_case) {
                        Ok(test) => Some(CompiledMatcher {
                            test,
                            ignore_case: m.ignore_case,
                            weight: m.weight,
                        }),
                        Err(reason) => {
                            warn!(signature = %sig.id, matcher = idx, %reason, "dropping matcher");
                            None
                        }
                    })
                    .collect();
                if matchers.is_empty() {
                    warn!(signature = %sig.id, "dropping signature without usable matchers");
                    return None;
                }
                Some(CompiledSignature {
                    signature: sig.clone(),
                    matchers,
                })
            })
            .collect();
        Self { signatures }
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    /// Best match: highest score, first declared on ties.
    pub fn detect(&self, path: &str, snippet: &[u8], options: &DetectOptions) -> Option<Match> {
        let mut best: Option<Match> = None;
        for m in self.candidates(path, snippet, options) {
            if best.as_ref().is_none_or(|b| m.score > b.score) {
                best = Some(m);
            }
        }
        best
    }

    /// Every signature meeting its threshold, by score descending then id.
    pub fn detect_all(&self, path: &str, snippet: &[u8], options: &DetectOptions) -> Vec<Match> {
        let mut all: Vec<Match> = self.candidates(path, snippet, options).collect();
        all.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// Raw clamped score of one signature, ignoring thresholds and filters.
    pub fn score(&self, id: &str, snippet: &[u8]) -> Option<f64> {
        let lowered = snippet.to_ascii_lowercase();
        self.signatures
            .iter()
            .find(|s| s.signature.answers_to(id))
            .map(|s| s.score(snippet, &lowered).0)
    }

    fn candidates<'a>(
        &'a self,
        path: &str,
        snippet: &'a [u8],
        options: &'a DetectOptions,
    ) -> impl Iterator<Item = Match> + 'a {
        let ext = RepoPath::new(path).extension_lower();
        let lowered = snippet.to_ascii_lowercase();
        self.signatures
            .iter()
            .filter(move |s| s.admitted_by(options))
            .filter(move |s| s.admits_extension(ext.as_deref()))
            .filter_map(move |s| {
                let (score, matched) = s.score(snippet, &lowered);
                let sig = &s.signature;
                (score >= sig.confidence_threshold).then(|| Match {
                    id: sig.id.clone(),
                    category: sig.category.clone(),
                    score,
                    threshold: sig.confidence_threshold,
                    matched,
                    metadata: sig.metadata.clone(),
                })
            })
    }
}

fn compile_matcher(kind: MatcherKind, text: Option<&str>, ignore_case: bool) -> Result<Test, String> {
    let text = text.ok_or_else(|| "matcher has neither value nor pattern".to_string())?;
    let literal = || {
        if ignore_case {
            text.as_bytes().to_ascii_lowercase()
        } else {
            text.as_bytes().to_vec()
        }
    };
    Ok(match kind {
        MatcherKind::Contains => Test::Contains(literal()),
        MatcherKind::Prefix => Test::Prefix(literal()),
        MatcherKind::Suffix => Test::Suffix(literal()),
        MatcherKind::Regex => Test::Regex(
            RegexBuilder::new(text)
                .multi_line(true)
                .case_insensitive(ignore_case)
                .build()
                .map_err(|e| e.to_string())?,
        ),
    })
}
