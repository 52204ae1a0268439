//! Writer wrapper that records every call and can be told to fail.
//!
//! Calls pass through to the wrapped writer unless a fault matches. Faults
//! are checked before the inner writer runs, so a failed call never reaches
//! the store.

use std::sync::{Arc, Mutex};

use msync_schemas::{FieldUpdate, RowHandle};
use msync_store::{DatasetWriter, StoreError};

pub struct FaultyWriter {
    inner: Arc<dyn DatasetWriter>,
    fail_on_call: Option<usize>,
    fail_on_record: Option<String>,
    calls: Mutex<Vec<RowHandle>>,
}

impl FaultyWriter {
    /// Pass-through writer that only records.
    pub fn new(inner: Arc<dyn DatasetWriter>) -> Self {
        Self {
            inner,
            fail_on_call: None,
            fail_on_record: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fail the `n`th call (1-based).
    pub fn fail_on_call(mut self, n: usize) -> Self {
        self.fail_on_call = Some(n);
        self
    }

    /// Fail any call targeting this record id.
    pub fn fail_on_record(mut self, record_id: impl Into<String>) -> Self {
        self.fail_on_record = Some(record_id.into());
        self
    }

    /// Every handle passed to `update_row`, in call order, including calls
    /// that failed.
    pub fn calls(&self) -> Vec<RowHandle> {
        self.calls
            .lock()
            .map(|c| c.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }
}

#[async_trait::async_trait]
impl DatasetWriter for FaultyWriter {
    async fn update_row(&self, handle: &RowHandle, update: &FieldUpdate) -> Result<(), StoreError> {
        let n = {
            let mut calls = self
                .calls
                .lock()
                .map_err(|_| StoreError::Io("faulty writer lock poisoned".to_string()))?;
            calls.push(handle.clone());
            calls.len()
        };

        if self.fail_on_call == Some(n) {
            return Err(StoreError::Rejected(format!("injected fault on call {n}")));
        }
        if self.fail_on_record.as_deref() == Some(handle.record_id()) {
            return Err(StoreError::Rejected(format!("injected fault on {handle}")));
        }

        self.inner.update_row(handle, update).await
    }
}
