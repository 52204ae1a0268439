//! In-memory dataset backend.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use msync_schemas::{DatasetRow, FieldUpdate, RowHandle};

use crate::{DatasetReader, DatasetWriter, StoreError};

/// Named tables held in memory.
///
/// Rows keep the handles they were inserted with, so fixtures control record
/// ids. Any field name is writable.
#[derive(Debug, Default)]
pub struct MemoryDataset {
    tables: Mutex<BTreeMap<String, Vec<DatasetRow>>>,
}

impl MemoryDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration of a table.
    pub fn with_dataset(self, name: impl Into<String>, rows: Vec<DatasetRow>) -> Self {
        if let Ok(mut tables) = self.tables.lock() {
            tables.insert(name.into(), rows);
        }
        self
    }

    pub fn insert_dataset(&self, name: impl Into<String>, rows: Vec<DatasetRow>) -> Result<(), StoreError> {
        self.lock()?.insert(name.into(), rows);
        Ok(())
    }

    /// Copy of a table's current rows, for before/after comparisons.
    pub fn snapshot(&self, dataset: &str) -> Result<Vec<DatasetRow>, StoreError> {
        self.lock()?
            .get(dataset)
            .cloned()
            .ok_or_else(|| StoreError::UnknownDataset(dataset.to_string()))
    }

    /// Current state of a single row.
    pub fn row(&self, handle: &RowHandle) -> Result<DatasetRow, StoreError> {
        let tables = self.lock()?;
        let rows = tables
            .get(handle.dataset())
            .ok_or_else(|| StoreError::UnknownDataset(handle.dataset().to_string()))?;
        rows.iter()
            .find(|r| &r.handle == handle)
            .cloned()
            .ok_or_else(|| StoreError::UnknownRecord(handle.clone()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Vec<DatasetRow>>>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Io("memory dataset lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl DatasetReader for MemoryDataset {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn list_rows(&self, dataset: &str) -> Result<Vec<DatasetRow>, StoreError> {
        self.snapshot(dataset)
    }
}

#[async_trait::async_trait]
impl DatasetWriter for MemoryDataset {
    async fn update_row(&self, handle: &RowHandle, update: &FieldUpdate) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let rows = tables
            .get_mut(handle.dataset())
            .ok_or_else(|| StoreError::UnknownDataset(handle.dataset().to_string()))?;
        let row = rows
            .iter_mut()
            .find(|r| &r.handle == handle)
            .ok_or_else(|| StoreError::UnknownRecord(handle.clone()))?;
        update.apply_to(row);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> MemoryDataset {
        MemoryDataset::new().with_dataset(
            "Manifest",
            vec![
                DatasetRow::new(RowHandle::new("Manifest", "rec1"))
                    .with_field("Sample ID", "S1")
                    .with_field("Project", "A"),
                DatasetRow::new(RowHandle::new("Manifest", "rec2")).with_field("Sample ID", "S2"),
            ],
        )
    }

    #[tokio::test]
    async fn list_rows_returns_stored_order() {
        let rows = store().list_rows("Manifest").await.unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.handle.record_id().to_string()).collect();
        assert_eq!(ids, vec!["rec1", "rec2"]);
    }

    #[tokio::test]
    async fn unknown_dataset_is_an_error() {
        let err = store().list_rows("Nope").await.unwrap_err();
        assert_eq!(err, StoreError::UnknownDataset("Nope".to_string()));
    }

    #[tokio::test]
    async fn update_touches_only_named_fields() {
        let s = store();
        let handle = RowHandle::new("Manifest", "rec1");
        let mut u = FieldUpdate::new();
        u.assign("comments", json!("re-run"));

        s.update_row(&handle, &u).await.unwrap();

        let row = s.row(&handle).unwrap();
        assert_eq!(row.get("comments"), Some(&json!("re-run")));
        assert_eq!(row.get("Project"), Some(&json!("A")));
        assert_eq!(row.get("Sample ID"), Some(&json!("S1")));
    }

    #[tokio::test]
    async fn update_unknown_record_is_an_error() {
        let handle = RowHandle::new("Manifest", "rec9");
        let err = store().update_row(&handle, &FieldUpdate::new()).await.unwrap_err();
        assert_eq!(err, StoreError::UnknownRecord(handle));
    }
}
