//! Parsing and normalization of schema and data documents.
//!
//! Every document goes through YAML first (JSON is a YAML subset) and is
//! converted into a `serde_json::Value` with object keys sorted, so the
//! normalized bytes of two equivalent schemas compare equal regardless of how
//! they were written.

use serde_json::{Map, Value};

use crate::error::SchemaError;

/// JSON Schema dialects the engine can build a validator for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaDraft {
    Draft4,
    Draft6,
    Draft7,
    Draft201909,
    Draft202012,
}

impl SchemaDraft {
    /// Only draft-07 and 2020-12 pass the draft gate.
    pub fn is_supported(self) -> bool {
        matches!(self, SchemaDraft::Draft7 | SchemaDraft::Draft202012)
    }

    /// Infer the dialect from a `$schema` URI; anything unknown falls back to 2020-12.
    pub fn from_uri(uri: &str) -> Self {
        if uri.contains("draft-07") {
            SchemaDraft::Draft7
        } else if uri.contains("2020-12") {
            SchemaDraft::Draft202012
        } else if uri.contains("2019-09") {
            SchemaDraft::Draft201909
        } else if uri.contains("draft-06") {
            SchemaDraft::Draft6
        } else if uri.contains("draft-04") {
            SchemaDraft::Draft4
        } else {
            SchemaDraft::Draft202012
        }
    }

    pub(crate) fn to_engine(self) -> jsonschema::Draft {
        match self {
            SchemaDraft::Draft4 => jsonschema::Draft::Draft4,
            SchemaDraft::Draft6 => jsonschema::Draft::Draft6,
            SchemaDraft::Draft7 => jsonschema::Draft::Draft7,
            SchemaDraft::Draft201909 => jsonschema::Draft::Draft201909,
            SchemaDraft::Draft202012 => jsonschema::Draft::Draft202012,
        }
    }
}

/// A parsed schema: normalized value plus the identity facts the engine needs.
#[derive(Clone, Debug)]
pub(crate) struct SchemaDocument {
    pub(crate) value: Value,
    pub(crate) id: Option<String>,
    /// `$schema` as written, before any offline stripping.
    pub(crate) declared: Option<Value>,
    pub(crate) draft: SchemaDraft,
}

impl SchemaDocument {
    pub(crate) fn parse(bytes: &[u8], offline: bool) -> Result<Self, SchemaError> {
        let mut value = canonicalize(parse_document(bytes, "schema")?);
        let declared = value.get("$schema").cloned();
        let draft = declared
            .as_ref()
            .and_then(Value::as_str)
            .map(SchemaDraft::from_uri)
            .unwrap_or(SchemaDraft::Draft202012);
        let id = schema_id(&value);
        if offline {
            strip_schema_keyword(&mut value);
        }
        Ok(Self {
            value,
            id,
            declared,
            draft,
        })
    }

    /// Serialized form used to compare two documents registered under one `$id`.
    pub(crate) fn normalized_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&self.value).unwrap_or_default()
    }
}

/// Reject a schema whose `$schema` names a dialect other than draft-07 or 2020-12.
///
/// A schema without `$schema` passes and is compiled as 2020-12.
pub fn ensure_supported_draft(schema: &Value) -> Result<(), SchemaError> {
    check_declared_draft(schema.get("$schema"))
}

pub(crate) fn check_declared_draft(declared: Option<&Value>) -> Result<(), SchemaError> {
    match declared {
        None => Ok(()),
        Some(Value::String(uri)) if uri.contains("draft-07") || uri.contains("2020-12") => Ok(()),
        Some(Value::String(uri)) => Err(SchemaError::UnsupportedDraft { found: uri.clone() }),
        Some(other) => Err(SchemaError::UnsupportedDraft {
            found: other.to_string(),
        }),
    }
}

/// Top-level `$id` in the form the engine requests it, see [`normalize_uri`].
pub(crate) fn schema_id(value: &Value) -> Option<String> {
    let id = normalize_uri(value.get("$id")?.as_str()?.trim());
    (!id.is_empty()).then_some(id)
}

/// Absolute URIs get the engine's RFC 3986 normalization (case of scheme and
/// host, dot segments, percent-encoding). An empty trailing fragment is
/// dropped; relative references are otherwise kept as written.
pub(crate) fn normalize_uri(uri: &str) -> String {
    let trimmed = uri.trim_end_matches('#');
    match jsonschema::Uri::parse(trimmed) {
        Ok(parsed) => parsed.normalize().as_str().trim_end_matches('#').to_string(),
        Err(_) => trimmed.to_string(),
    }
}

/// Parse YAML, falling back to JSON. The error carries both parser messages.
pub fn parse_document(bytes: &[u8], what: &'static str) -> Result<Value, SchemaError> {
    let yaml = match serde_yaml::from_slice::<serde_yaml::Value>(bytes) {
        Ok(doc) => match yaml_to_json(doc) {
            Ok(value) => return Ok(value),
            Err(msg) => msg,
        },
        Err(e) => e.to_string(),
    };
    serde_json::from_slice::<Value>(bytes).map_err(|json| SchemaError::Format {
        what,
        yaml,
        json: json.to_string(),
    })
}

/// Convert a YAML tree into JSON. Scalar mapping keys are stringified.
fn yaml_to_json(value: serde_yaml::Value) -> Result<Value, String> {
    use serde_yaml::Value as Y;
    Ok(match value {
        Y::Null => Value::Null,
        Y::Bool(b) => Value::Bool(b),
        Y::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                let f = n.as_f64().unwrap_or(f64::NAN);
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("number {n} has no JSON representation"))?
            }
        }
        Y::String(s) => Value::String(s),
        Y::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Y::Mapping(entries) => {
            let mut map = Map::new();
            for (k, v) in entries {
                let key = match k {
                    Y::String(s) => s,
                    Y::Number(n) => n.to_string(),
                    Y::Bool(b) => b.to_string(),
                    Y::Null => "null".to_string(),
                    other => return Err(format!("unsupported mapping key {other:?}")),
                };
                map.insert(key, yaml_to_json(v)?);
            }
            Value::Object(map)
        }
        Y::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

/// Rebuild every object with its keys in sorted order.
pub fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

fn strip_schema_keyword(value: &mut Value) {
    if let Value::Object(map) = value {
        map.remove("$schema");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn yaml_and_json_normalize_to_the_same_bytes() {
        let yaml = b"type: object\n$id: https://x/a\nproperties:\n  b: {type: string}\n";
        let json = br#"{"properties":{"b":{"type":"string"}},"$id":"https://x/a","type":"object"}"#;
        let a = SchemaDocument::parse(yaml, false).expect("yaml");
        let b = SchemaDocument::parse(json, false).expect("json");
        assert_eq!(a.normalized_bytes(), b.normalized_bytes());
        assert_eq!(a.id.as_deref(), Some("https://x/a"));
    }

    #[test]
    fn offline_strips_schema_but_keeps_declared_draft() {
        let doc = SchemaDocument::parse(
            br#"{"$schema":"http://json-schema.org/draft-07/schema#","type":"string"}"#,
            true,
        )
        .expect("parse");
        assert!(doc.value.get("$schema").is_none());
        assert_eq!(doc.draft, SchemaDraft::Draft7);
        assert!(doc.declared.is_some());
    }

    #[test]
    fn draft_gate_accepts_only_draft07_and_2020_12() {
        assert!(ensure_supported_draft(&json!({"type": "object"})).is_ok());
        assert!(
            ensure_supported_draft(&json!({"$schema": "http://json-schema.org/draft-07/schema#"}))
                .is_ok()
        );
        assert!(
            ensure_supported_draft(
                &json!({"$schema": "https://json-schema.org/draft/2020-12/schema"})
            )
            .is_ok()
        );
        for uri in [
            "http://json-schema.org/draft-04/schema#",
            "https://json-schema.org/draft/2019-09/schema",
            "https://example.com/custom",
        ] {
            let err = ensure_supported_draft(&json!({ "$schema": uri })).expect_err(uri);
            assert!(matches!(err, SchemaError::UnsupportedDraft { .. }), "{uri}");
        }
        assert!(ensure_supported_draft(&json!({"$schema": 7})).is_err());
    }

    #[test]
    fn unparseable_input_reports_both_parsers() {
        let err = parse_document(b"{ \"a\": [1, 2", "data").expect_err("broken");
        match err {
            SchemaError::Format { what, yaml, json } => {
                assert_eq!(what, "data");
                assert!(!yaml.is_empty());
                assert!(!json.is_empty());
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn non_string_keys_are_stringified() {
        let value = parse_document(b"1: one\ntrue: yes\n", "data").expect("parse");
        assert_eq!(value, json!({"1": "one", "true": "yes"}));
    }

    #[test]
    fn id_trailing_hash_is_trimmed() {
        assert_eq!(
            schema_id(&json!({"$id": "https://x/types#"})).as_deref(),
            Some("https://x/types")
        );
        assert_eq!(schema_id(&json!({"$id": ""})), None);
        assert_eq!(schema_id(&json!({"$id": 3})), None);
    }

    #[test]
    fn absolute_ids_are_normalized_like_engine_requests() {
        assert_eq!(
            schema_id(&json!({"$id": "HTTPS://Example.COM/types"})).as_deref(),
            Some("https://example.com/types")
        );
        assert_eq!(normalize_uri("https://x/a/../types#"), "https://x/types");
        assert_eq!(normalize_uri("types.json"), "types.json");
    }
}
