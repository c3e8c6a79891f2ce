use std::sync::Arc;

use camino::Utf8PathBuf;
use goneat_mapping::{Layer, Manager, Resolution, Resolver};
use goneat_schema::SchemaRegistry;

fn repo_with_overlay(overlay: &str) -> (tempfile::TempDir, Utf8PathBuf) {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf8");
    std::fs::create_dir_all(root.join(".goneat")).expect("mkdir");
    std::fs::write(root.join(".goneat/schema-mappings.yaml"), overlay).expect("write");
    (tmp, root)
}

#[test]
fn overlay_mapping_replaces_builtin_schema_for_same_pattern() {
    let (_tmp, root) = repo_with_overlay(
        r#"version: "1.0.0"
mappings:
  - pattern: ".goneat/config.yaml"
    schema_id: team-config
    source: repository
"#,
    );
    let manager = Manager::new(Arc::new(SchemaRegistry::embedded()));
    let loaded = manager.load(&root, None).expect("load");
    let mut resolver = Resolver::new(&loaded.effective).expect("resolver");

    match resolver.resolve(".goneat/config.yaml") {
        Resolution::Mapped(m) => {
            assert_eq!(m.schema_id, "team-config");
            assert_eq!(m.layer, Layer::Repository);
            assert_eq!(m.source.as_deref(), Some("repository"));
        }
        other => panic!("unexpected {other:?}"),
    }
    // Builtin rules the overlay does not touch keep working.
    assert_eq!(
        resolver.resolve(".goneat/hooks.yaml").schema_id(),
        Some("hooks-manifest-v1.0.0")
    );
    assert!(resolver.resolve(".git/config").is_excluded());
}

#[test]
fn overlay_exclusions_apply_on_top_of_builtin_mappings() {
    let (_tmp, root) = repo_with_overlay(
        r#"version: "1.0.0"
mappings:
  - pattern: "**/*.yaml"
    schema_id: generic
exclusions:
  - pattern: "tmp/**/*.yaml"
    action: skip
    reason: scratch files
"#,
    );
    let manager = Manager::new(Arc::new(SchemaRegistry::embedded()));
    let loaded = manager.load(&root, None).expect("load");
    let mut resolver = Resolver::new(&loaded.effective).expect("resolver");

    assert!(resolver.resolve("tmp/example.yaml").is_excluded());
    assert_eq!(resolver.resolve("deploy/app.yaml").schema_id(), Some("generic"));
    let metrics = resolver.metrics();
    assert_eq!(metrics.excluded, 1);
    assert_eq!(metrics.mapped, 1);
    assert_eq!(metrics.files_evaluated, 2);
}

#[test]
fn custom_manifest_path_is_honored() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf8");
    std::fs::create_dir_all(root.join("ci")).expect("mkdir");
    std::fs::write(
        root.join("ci/mappings.yaml"),
        "version: \"1.0.0\"\nmappings:\n  - pattern: ci/*.yml\n    schema_id: ci\n",
    )
    .expect("write");

    let manager = Manager::new(Arc::new(SchemaRegistry::embedded()));
    let loaded = manager
        .load(&root, Some(camino::Utf8Path::new("ci/mappings.yaml")))
        .expect("load");
    assert!(loaded.manifest_path.ends_with("ci/mappings.yaml"));
    let mut resolver = Resolver::new(&loaded.effective).expect("resolver");
    assert_eq!(resolver.resolve("ci/build.yml").schema_id(), Some("ci"));
}
