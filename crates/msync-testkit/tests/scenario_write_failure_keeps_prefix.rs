//! Scenario: a failed write aborts the run without rolling back
//!
//! GREEN when:
//! - the writer's error is what the run reports
//! - rows written before the failure stay written
//! - no row after the failure is attempted
//! - the audit log ends in RUN_ABORTED and still verifies

use std::sync::Arc;

use msync_audit::{verify_hash_chain, AuditWriter};
use msync_config::SyncConfig;
use msync_reconcile::RunState;
use msync_runtime::{RunError, SyncRunner};
use msync_schemas::RowHandle;
use msync_store::StoreError;
use msync_testkit::{batch, manifest, memory_store, FaultyWriter, MANIFEST};
use serde_json::{json, Value};

#[tokio::test]
async fn second_write_fails_first_stays() {
    let dir = tempfile::tempdir().unwrap();
    let audit_path = dir.path().join("audit.jsonl");
    let mut audit = AuditWriter::new(&audit_path, true).unwrap();

    let cfg = SyncConfig::default();
    let store = Arc::new(memory_store(
        manifest(&["S1", "S2", "S3"]),
        batch(&[json!("S1"), json!("S2"), json!("S3")]),
    ));
    let writer = FaultyWriter::new(store.clone()).fail_on_call(2);

    let abort = SyncRunner::new(&cfg)
        .with_audit(&mut audit)
        .run(&*store, &writer)
        .await
        .unwrap_err();

    let injected = StoreError::Rejected("injected fault on call 2".into());
    assert_eq!(abort.to_string(), injected.to_string());
    assert_eq!(
        abort.cause,
        RunError::Write {
            sample_id: "S2".into(),
            source: injected
        }
    );
    assert_eq!(abort.state, RunState::Reconciling);
    assert_eq!(abort.rows_merged, 1);
    assert_eq!(writer.call_count(), 2);

    let rec1 = store.row(&RowHandle::new(MANIFEST, "rec1")).unwrap();
    assert_eq!(rec1.get("comments"), Some(&json!("batch note 1")));
    for id in ["rec2", "rec3"] {
        let row = store.row(&RowHandle::new(MANIFEST, id)).unwrap();
        assert_eq!(row.get("comments"), None, "{id}");
    }

    let content = std::fs::read_to_string(&audit_path).unwrap();
    let events: Vec<Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let types: Vec<&str> = events.iter().map(|e| e["event_type"].as_str().unwrap()).collect();
    assert_eq!(types, vec!["RUN_START", "ROW_MERGED", "RUN_ABORTED"]);
    assert_eq!(events[2]["payload"]["kind"], json!("WRITE_FAILURE"));
    assert_eq!(events[2]["payload"]["sample_id"], json!("S2"));
    assert!(verify_hash_chain(&audit_path).unwrap().is_valid());
}

#[tokio::test]
async fn failure_on_first_row_merges_nothing() {
    let cfg = SyncConfig::default();
    let store = Arc::new(memory_store(manifest(&["S1", "S2"]), batch(&[json!("S2"), json!("S1")])));
    let writer = FaultyWriter::new(store.clone()).fail_on_record("rec2");
    let before = store.snapshot(MANIFEST).unwrap();

    let abort = SyncRunner::new(&cfg).run(&*store, &writer).await.unwrap_err();

    assert_eq!(abort.rows_merged, 0);
    assert_eq!(writer.calls(), vec![RowHandle::new(MANIFEST, "rec2")]);
    assert_eq!(store.snapshot(MANIFEST).unwrap(), before);
}
