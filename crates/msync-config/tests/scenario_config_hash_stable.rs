//! Config hash stability
//!
//! GREEN when:
//! - the same layers hash identically on repeated loads
//! - key order inside a YAML document does not change the hash
//! - different values hash differently
//! - overlays take effect and stay stable

use msync_config::load_layered_yaml_from_strings;

const BASE_YAML: &str = r#"
datasets:
  manifest:
    name: "Manifest"
    path: "data/manifest.csv"
  batch:
    name: "CSV file"
    path: "data/csv_file.csv"
diagnostics:
  name_offending_rows: false
audit:
  hash_chain: true
"#;

const BASE_YAML_REORDERED: &str = r#"
audit:
  hash_chain: true
diagnostics:
  name_offending_rows: false
datasets:
  batch:
    path: "data/csv_file.csv"
    name: "CSV file"
  manifest:
    path: "data/manifest.csv"
    name: "Manifest"
"#;

const OVERLAY_YAML: &str = r#"
datasets:
  batch:
    path: "incoming/plate_07.csv"
diagnostics:
  name_offending_rows: true
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();

    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
}

#[test]
fn reordered_keys_produce_same_hash() {
    let original = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let reordered = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();

    assert_eq!(
        original.config_hash, reordered.config_hash,
        "reordering keys in YAML must not change the hash"
    );
}

#[test]
fn different_values_produce_different_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML, "audit:\n  hash_chain: false\n"]).unwrap();

    assert_ne!(a.config_hash, b.config_hash);
}

#[test]
fn overlay_takes_effect_and_hash_is_stable() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);

    let cfg = a.sync_config().unwrap();
    assert_eq!(
        cfg.datasets.batch.path.as_deref(),
        Some(std::path::Path::new("incoming/plate_07.csv"))
    );
    assert_eq!(cfg.datasets.batch.name, "CSV file");
    assert!(cfg.diagnostics.name_offending_rows);
}

#[test]
fn hash_is_64_hex_chars() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(loaded.config_hash.len(), 64);
    assert!(loaded.config_hash.chars().all(|c| c.is_ascii_hexdigit()));
}
