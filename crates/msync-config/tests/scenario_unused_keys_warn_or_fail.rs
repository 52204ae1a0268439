use msync_config::{load_layered_yaml_from_strings, report_unused_keys, UnusedKeyPolicy};

/// Unused-key guard
///
/// 1) Misspelled / unknown keys are reported under WARN without error.
/// 2) The same keys fail under FAIL.
/// 3) Nested keys under consumed prefixes are not flagged.

#[test]
fn warn_policy_reports_unused_keys_without_error() {
    let yaml = r#"
datasets:
  manifest:
    name: "Manifest"
    pth: "typo.csv"
diagnostic:
  name_offending_rows: true
"#;

    let loaded = load_layered_yaml_from_strings(&[yaml]).expect("config load must succeed");
    let report =
        report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn).expect("warn must not error");

    assert!(!report.is_clean());
    assert_eq!(
        report.unused_leaf_pointers,
        vec![
            "/datasets/manifest/pth".to_string(),
            "/diagnostic/name_offending_rows".to_string(),
        ]
    );
}

#[test]
fn fail_policy_errors_on_unused_keys() {
    let loaded = load_layered_yaml_from_strings(&["retries: 3\n"]).unwrap();
    let err = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap_err();
    assert!(err.to_string().contains("CONFIG_UNUSED_KEYS"));
}

#[test]
fn transfer_entries_are_consumed() {
    let yaml = r#"
fields:
  match_key:
    source: "Sample ID1"
    destination: "Sample ID"
  transfer:
    - source: "comment"
      destination: "comments"
audit:
  path: "exports/audit.jsonl"
"#;

    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap();
    assert!(report.is_clean(), "unexpected: {:?}", report.unused_leaf_pointers);
}
