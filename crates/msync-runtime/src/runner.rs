use msync_audit::{AuditEventType, AuditWriter};
use msync_config::SyncConfig;
use msync_reconcile::{
    validate_batch, MergeInstruction, Reconciler, RunState, ValidationOptions,
};
use msync_schemas::DatasetRow;
use msync_store::{DatasetReader, DatasetWriter, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{RunAbort, RunError};

/// One manifest row the run wrote to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedRow {
    pub sample_id: String,
    pub record_id: String,
}

/// Summary of a completed run. `merged` is in batch order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub manifest_rows: usize,
    pub batch_rows: usize,
    pub merged: Vec<MergedRow>,
}

/// What a run would write, computed without writing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunPlan {
    pub run_id: Uuid,
    pub manifest_rows: usize,
    pub batch_rows: usize,
    pub instructions: Vec<MergeInstruction>,
}

/// Drives a single sync run.
///
/// A runner is spent by [`SyncRunner::run`]; build a new one per run.
pub struct SyncRunner<'a> {
    config: &'a SyncConfig,
    audit: Option<&'a mut AuditWriter>,
    run_id: Uuid,
    state: RunState,
    rows_merged: usize,
}

impl<'a> SyncRunner<'a> {
    pub fn new(config: &'a SyncConfig) -> Self {
        Self {
            config,
            audit: None,
            run_id: Uuid::new_v4(),
            state: RunState::Idle,
            rows_merged: 0,
        }
    }

    pub fn with_audit(mut self, audit: &'a mut AuditWriter) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Read both datasets, validate the batch, then resolve and write one
    /// row at a time. The first failure ends the run; rows already written
    /// are left as they are.
    pub async fn run(
        mut self,
        reader: &dyn DatasetReader,
        writer: &dyn DatasetWriter,
    ) -> Result<RunReport, RunAbort> {
        let config = self.config;
        let run_id = self.run_id;

        info!(run_id = %run_id, backend = reader.backend_name(), "Starting Update");
        let start = json!({
            "manifest": config.datasets.manifest.name,
            "batch": config.datasets.batch.name,
        });
        if let Err(e) = self.record(AuditEventType::RunStart, start) {
            return Err(self.abort(e));
        }

        let (manifest, batch) = match read_datasets(reader, config).await {
            Ok(rows) => rows,
            Err(e) => return Err(self.abort(RunError::Read(e))),
        };
        debug!(
            run_id = %run_id,
            manifest_rows = manifest.len(),
            batch_rows = batch.len(),
            "datasets loaded"
        );

        if let Err(e) = self.advance(RunState::Validating) {
            return Err(self.abort(e));
        }
        let opts = ValidationOptions {
            name_offending_rows: config.diagnostics.name_offending_rows,
        };
        let validated = match validate_batch(&batch, config.fields.batch_key_field(), opts) {
            Ok(v) => v,
            Err(e) => return Err(self.abort(e.into())),
        };

        if let Err(e) = self.advance(RunState::Reconciling) {
            return Err(self.abort(e));
        }
        let reconciler = Reconciler::new(&manifest, &config.fields);
        let mut merged = Vec::with_capacity(validated.len());

        for entry in validated.entries() {
            info!(run_id = %run_id, sample_id = %entry.key, "Updating {}", entry.key);
            let instruction = match reconciler.instruction_for(&entry) {
                Ok(i) => i,
                Err(e) => return Err(self.abort(e.into())),
            };
            debug!(
                run_id = %run_id,
                sample_id = %instruction.sample_id,
                record_id = %instruction.target.record_id(),
                "row resolved"
            );

            if let Err(source) = writer.update_row(&instruction.target, &instruction.update).await {
                let cause = RunError::Write {
                    sample_id: instruction.sample_id.clone(),
                    source,
                };
                return Err(self.abort(cause));
            }
            self.rows_merged += 1;

            let row = MergedRow {
                sample_id: instruction.sample_id,
                record_id: instruction.target.record_id().to_string(),
            };
            let fields: Vec<&str> = instruction.update.fields().collect();
            let payload = json!({
                "position": entry.position,
                "sample_id": row.sample_id,
                "record_id": row.record_id,
                "fields": fields,
            });
            if let Err(e) = self.record(AuditEventType::RowMerged, payload) {
                return Err(self.abort(e));
            }
            merged.push(row);
        }

        if let Err(e) = self.advance(RunState::Completed) {
            return Err(self.abort(e));
        }
        let done = json!({ "rows_merged": self.rows_merged });
        if let Err(e) = self.record(AuditEventType::RunComplete, done) {
            return Err(self.abort(e));
        }
        info!(run_id = %run_id, rows_merged = self.rows_merged, "Update complete!");

        Ok(RunReport {
            run_id,
            manifest_rows: manifest.len(),
            batch_rows: batch.len(),
            merged,
        })
    }

    /// Everything [`SyncRunner::run`] does short of writing. Fails with the
    /// same errors a real run would hit first.
    pub async fn plan(&self, reader: &dyn DatasetReader) -> Result<RunPlan, RunAbort> {
        let config = self.config;
        let fail = |state: RunState, cause: RunError| RunAbort {
            run_id: self.run_id,
            rows_merged: 0,
            state,
            cause,
        };

        let (manifest, batch) = read_datasets(reader, config)
            .await
            .map_err(|e| fail(RunState::Idle, RunError::Read(e)))?;

        let opts = ValidationOptions {
            name_offending_rows: config.diagnostics.name_offending_rows,
        };
        let validated = validate_batch(&batch, config.fields.batch_key_field(), opts)
            .map_err(|e| fail(RunState::Validating, e.into()))?;

        let reconciler = Reconciler::new(&manifest, &config.fields);
        let instructions = reconciler
            .plan(&validated)
            .map_err(|e| fail(RunState::Reconciling, e.into()))?;

        Ok(RunPlan {
            run_id: self.run_id,
            manifest_rows: manifest.len(),
            batch_rows: batch.len(),
            instructions,
        })
    }

    fn advance(&mut self, next: RunState) -> Result<(), RunError> {
        self.state = self.state.transition(next)?;
        debug!(run_id = %self.run_id, state = %self.state, "run state");
        Ok(())
    }

    fn record(&mut self, event: AuditEventType, payload: Value) -> Result<(), RunError> {
        if let Some(audit) = self.audit.as_deref_mut() {
            audit
                .append(self.run_id, event, payload)
                .map_err(|e| RunError::Audit(format!("{e:#}")))?;
        }
        Ok(())
    }

    fn abort(&mut self, cause: RunError) -> RunAbort {
        let failed_in = self.state;
        error!(
            run_id = %self.run_id,
            state = %failed_in,
            rows_merged = self.rows_merged,
            kind = cause.kind(),
            "{cause}"
        );

        if let Ok(next) = self.state.transition(RunState::Aborted) {
            self.state = next;
        }
        let payload = json!({
            "state": failed_in.as_str(),
            "rows_merged": self.rows_merged,
            "kind": cause.kind(),
            "sample_id": cause.sample_id(),
            "message": cause.to_string(),
        });
        if let Err(e) = self.record(AuditEventType::RunAborted, payload) {
            warn!(run_id = %self.run_id, "could not record abort: {e}");
        }

        RunAbort {
            run_id: self.run_id,
            rows_merged: self.rows_merged,
            state: failed_in,
            cause,
        }
    }
}

async fn read_datasets(
    reader: &dyn DatasetReader,
    config: &SyncConfig,
) -> Result<(Vec<DatasetRow>, Vec<DatasetRow>), StoreError> {
    tokio::try_join!(
        reader.list_rows(&config.datasets.manifest.name),
        reader.list_rows(&config.datasets.batch.name),
    )
}
