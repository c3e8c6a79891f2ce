use camino::Utf8PathBuf;
use goneat_schema::{
    CompileOptions, IdIndex, SchemaDraft, SchemaError, compile_schema_with_ref_dirs,
};

fn ref_dir() -> (tempfile::TempDir, Utf8PathBuf) {
    let tmp = tempfile::tempdir().expect("tempdir");
    let dir = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf8");
    std::fs::create_dir_all(dir.join("common")).expect("mkdir");
    std::fs::write(
        dir.join("common/port.yaml"),
        "$schema: http://json-schema.org/draft-07/schema#\n\
         $id: https://schemas.example.test/common/port\n\
         type: integer\n\
         minimum: 1\n\
         maximum: 65535\n",
    )
    .expect("write");
    (tmp, dir)
}

const SERVICE: &[u8] = br#"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "$id": "https://schemas.example.test/service",
  "type": "object",
  "properties": {
    "ports": {"type": "array", "items": {"$ref": "https://schemas.example.test/common/port"}}
  }
}"#;

#[test]
fn offline_mode_compiles_draft07_schemas_against_yaml_ref_dirs() {
    let (_tmp, dir) = ref_dir();
    let schema = compile_schema_with_ref_dirs(
        SERVICE,
        &[&dir],
        &CompileOptions::default().offline(true),
    )
    .expect("compile");
    assert_eq!(schema.draft(), SchemaDraft::Draft7);
    assert_eq!(schema.id(), Some("https://schemas.example.test/service"));

    let ok = schema.validate_bytes(b"ports: [80, 443]\n").expect("parse");
    assert!(ok.valid);

    let bad = schema.validate_bytes(b"ports: [80, 70000]\n").expect("parse");
    assert!(!bad.valid);
    assert_eq!(bad.errors.len(), 1);
    assert_eq!(bad.errors[0].path, "ports.1");
}

#[test]
fn missing_reference_is_a_compile_error_not_a_fetch() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let empty = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf8");
    let err = compile_schema_with_ref_dirs(SERVICE, &[&empty], &CompileOptions::default())
        .expect_err("unresolved ref");
    assert!(matches!(err, SchemaError::Compile { .. }), "{err}");
}

#[test]
fn index_lists_ids_with_their_source_paths() {
    let (_tmp, dir) = ref_dir();
    let index = IdIndex::build_from_ref_dirs(&[&dir]).expect("index");
    let entry = index
        .get("https://schemas.example.test/common/port")
        .expect("indexed");
    assert!(entry.path.ends_with("common/port.yaml"));
    assert!(!entry.normalized.is_empty());
    assert!(!index.is_empty());
}
